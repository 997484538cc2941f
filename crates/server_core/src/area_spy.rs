use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use chrono::{DateTime, Duration, Utc};
use shared::domain::{Location, PlayerId};

use crate::{
    perms::{nodes, Permissions},
    world::{OnlinePlayers, PlayerSnapshot},
};

pub const MAX_AREA_RADIUS: u32 = 512;
pub const MAX_AREA_MINUTES: u32 = 1440;

#[derive(Debug, Clone, PartialEq)]
pub struct AreaWatch {
    pub center: Location,
    pub radius: u32,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AreaWatch {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    pub fn covers(&self, location: &Location) -> bool {
        self.center.within(location, f64::from(self.radius))
    }
}

/// Admins watching a fixed area for LOCAL chat they are not in range of.
pub struct AreaSpyState {
    perms: Permissions,
    watches: RwLock<HashMap<PlayerId, AreaWatch>>,
}

impl AreaSpyState {
    pub fn new(perms: Permissions) -> Self {
        Self {
            perms,
            watches: RwLock::new(HashMap::new()),
        }
    }

    /// Watches the area around the admin's current location. `minutes = None`
    /// never expires. Returns `None` without permission.
    pub fn enable(
        &self,
        admin: &PlayerSnapshot,
        radius: u32,
        minutes: Option<u32>,
        now: DateTime<Utc>,
    ) -> Option<AreaWatch> {
        if !self.perms.has(admin, nodes::SPY) {
            return None;
        }
        let watch = AreaWatch {
            center: admin.location.clone(),
            radius: radius.clamp(1, MAX_AREA_RADIUS),
            expires_at: minutes
                .map(|m| now + Duration::minutes(i64::from(m.clamp(1, MAX_AREA_MINUTES)))),
        };
        self.watches
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(admin.id, watch.clone());
        Some(watch)
    }

    pub fn disable(&self, admin: PlayerId) -> bool {
        self.watches
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&admin)
            .is_some()
    }

    /// The admin's live watch. Expired watches and watches whose owner lost
    /// permission are dropped here.
    pub fn active_watch(&self, admin: &PlayerSnapshot, now: DateTime<Utc>) -> Option<AreaWatch> {
        let watch = self
            .watches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&admin.id)
            .cloned()?;
        if watch.is_expired(now) || !self.perms.has(admin, nodes::SPY) {
            self.disable(admin.id);
            return None;
        }
        Some(watch)
    }

    /// Online admins whose live watch covers `location`.
    pub fn watchers<'a>(
        &self,
        online: &'a OnlinePlayers,
        location: &Location,
        now: DateTime<Utc>,
    ) -> Vec<(&'a PlayerSnapshot, AreaWatch)> {
        online
            .iter()
            .filter_map(|player| {
                let watch = self.active_watch(player, now)?;
                watch.covers(location).then_some((player, watch))
            })
            .collect()
    }
}
