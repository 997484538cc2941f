//! Combined chat history of one client session and the views over it.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use shared::{
    codec::{detect, Envelope, Marker},
    Channel,
};

use crate::{
    classify::{Classification, Classifier, EntryKind},
    merged::MergedTabs,
};

/// Oldest entries are evicted past this many.
pub const MAX_HISTORY: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub kind: EntryKind,
    pub message: Envelope,
    /// Delivery tag the message arrived with, if any.
    pub marker: Option<Marker>,
    pub received_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(kind: EntryKind, message: Envelope, received_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            marker: detect(&message),
            message,
            received_at,
        }
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    Shown(EntryKind),
    Hidden(EntryKind),
    Dropped,
}

impl Arrival {
    pub fn is_shown(self) -> bool {
        matches!(self, Arrival::Shown(_))
    }
}

/// Filter describing what the chat surface currently displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub current: Channel,
    /// Non-empty only while a merged view that includes `current` is active.
    pub merged: Vec<Channel>,
    pub show_system_in_all_tabs: bool,
}

impl View {
    pub fn shows(&self, kind: EntryKind) -> bool {
        match kind {
            EntryKind::Private => true,
            EntryKind::System => {
                self.show_system_in_all_tabs
                    || matches!(self.current, Channel::Global | Channel::Admin)
            }
            EntryKind::Channel(channel) => self.includes(channel),
        }
    }

    /// Channels whose messages are on screen.
    pub fn includes(&self, channel: Channel) -> bool {
        if self.merged.is_empty() {
            channel == self.current
        } else {
            self.merged.contains(&channel)
        }
    }

    pub fn channels(&self) -> Vec<Channel> {
        if self.merged.is_empty() {
            vec![self.current]
        } else {
            self.merged.clone()
        }
    }
}

pub struct ChatState {
    history: VecDeque<Entry>,
    capacity: usize,
    current: Channel,
    unread: BTreeMap<Channel, u32>,
    merged: MergedTabs,
    classifier: Classifier,
    show_system_in_all_tabs: bool,
}

impl ChatState {
    pub fn new(merged: MergedTabs, show_system_in_all_tabs: bool) -> Self {
        Self::with_capacity(merged, show_system_in_all_tabs, MAX_HISTORY)
    }

    pub fn with_capacity(merged: MergedTabs, show_system_in_all_tabs: bool, capacity: usize) -> Self {
        Self {
            history: VecDeque::new(),
            capacity: capacity.max(1),
            current: Channel::Global,
            unread: BTreeMap::new(),
            merged,
            classifier: Classifier::new(),
            show_system_in_all_tabs,
        }
    }

    pub fn current(&self) -> Channel {
        self.current
    }

    pub fn merged(&self) -> &MergedTabs {
        &self.merged
    }

    pub fn show_system_in_all_tabs(&self) -> bool {
        self.show_system_in_all_tabs
    }

    pub fn set_show_system_in_all_tabs(&mut self, show: bool) {
        self.show_system_in_all_tabs = show;
    }

    pub fn view(&self) -> View {
        let merged = if self.merged.is_active() && self.merged.contains(self.current) {
            self.merged.channels().collect()
        } else {
            Vec::new()
        };
        View {
            current: self.current,
            merged,
            show_system_in_all_tabs: self.show_system_in_all_tabs,
        }
    }

    /// Classifies and stores one inbound message.
    pub fn receive(&mut self, message: Envelope, now: DateTime<Utc>) -> Arrival {
        let kind = match self.classifier.classify(&message, self.current, now) {
            Classification::Duplicate => return Arrival::Dropped,
            Classification::Store(kind) => kind,
        };

        let view = self.view();
        match kind {
            EntryKind::Channel(channel) if !view.includes(channel) => self.bump_unread(channel),
            // Without "system in all tabs" system lines belong to GLOBAL.
            EntryKind::System
                if !self.show_system_in_all_tabs && !view.includes(Channel::Global) =>
            {
                self.bump_unread(Channel::Global)
            }
            _ => {}
        }

        self.history.push_back(Entry::new(kind, message, now));
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }

        if view.shows(kind) {
            Arrival::Shown(kind)
        } else {
            Arrival::Hidden(kind)
        }
    }

    /// Returns false when `channel` already was current.
    pub fn set_current(&mut self, channel: Channel) -> bool {
        if channel == self.current {
            return false;
        }
        self.current = channel;
        self.mark_view_read();
        true
    }

    pub fn toggle_merged(&mut self, channel: Channel) {
        self.merged.toggle(channel);
        self.mark_view_read();
    }

    pub fn unread(&self, channel: Channel) -> u32 {
        self.unread.get(&channel).copied().unwrap_or_default()
    }

    pub fn history(&self) -> impl Iterator<Item = &Entry> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Entries `view` displays, oldest first.
    pub fn entries_for<'a>(&'a self, view: &'a View) -> impl Iterator<Item = &'a Entry> + 'a {
        self.history.iter().filter(move |entry| view.shows(entry.kind))
    }

    /// Entries of the current view, oldest first.
    pub fn visible(&self) -> Vec<&Entry> {
        let view = self.view();
        self.history
            .iter()
            .filter(|entry| view.shows(entry.kind))
            .collect()
    }

    /// Zeroes the counters of every channel now on screen.
    pub fn mark_view_read(&mut self) {
        for channel in self.view().channels() {
            self.unread.remove(&channel);
        }
    }

    fn bump_unread(&mut self, channel: Channel) {
        *self.unread.entry(channel).or_default() += 1;
    }
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
