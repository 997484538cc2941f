use std::{
    collections::VecDeque,
    sync::{PoisonError, RwLock},
};

use chrono::{DateTime, Duration, Utc};
use shared::{channel::Channel, domain::Location, text::RichText};

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub at: DateTime<Utc>,
    pub channel: Channel,
    pub location: Location,
    pub formatted: RichText,
}

/// Bounded FIFO of positioned chat lines, queried by area and age.
pub struct HistoryBuffer {
    capacity: usize,
    records: RwLock<VecDeque<HistoryRecord>>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: RwLock::new(VecDeque::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, record: HistoryRecord) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records from the last `minutes` (at least 1) in the same dimension within
    /// `radius` blocks (at least 1) of `center`, oldest first.
    pub fn query(
        &self,
        center: &Location,
        radius: u32,
        minutes: u32,
        now: DateTime<Utc>,
    ) -> Vec<HistoryRecord> {
        let since = now - Duration::minutes(i64::from(minutes.max(1)));
        let radius = f64::from(radius.max(1));
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|record| record.at >= since && center.within(&record.location, radius))
            .cloned()
            .collect()
    }
}
