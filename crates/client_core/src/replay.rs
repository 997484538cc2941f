//! Drives a host chat widget that only knows how to append and clear lines.
//!
//! Live messages are classified on arrival and the caller displays them when
//! [`Arrival::is_shown`]. Switching tabs clears the widget and replays the
//! filtered history. Hosts usually route replayed lines back through their
//! normal message hook, so arrivals during a replay pass straight through
//! without being stored again.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard, PoisonError,
};

use chrono::{DateTime, Utc};
use shared::{codec::Envelope, Channel};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    engine::{Arrival, ChatState, Entry, View},
    merged::MergedTabs,
};

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("chat surface cannot be cleared: {0}")]
    ClearFailed(String),
}

pub trait ChatSurface {
    fn clear(&mut self) -> Result<(), SurfaceError>;
    fn show(&mut self, entry: &Entry);
}

pub struct ClientChat {
    state: Mutex<ChatState>,
    rebuilding: AtomicBool,
}

struct RebuildGuard<'a>(&'a AtomicBool);

impl Drop for RebuildGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ClientChat {
    pub fn new(state: ChatState) -> Self {
        Self {
            state: Mutex::new(state),
            rebuilding: AtomicBool::new(false),
        }
    }

    pub fn with_merged(merged: MergedTabs, show_system_in_all_tabs: bool) -> Self {
        Self::new(ChatState::new(merged, show_system_in_all_tabs))
    }

    pub fn is_rebuilding(&self) -> bool {
        self.rebuilding.load(Ordering::SeqCst)
    }

    /// `None` while a replay is running: the line is one of ours being re-shown.
    pub fn handle_incoming(&self, message: Envelope, now: DateTime<Utc>) -> Option<Arrival> {
        if self.is_rebuilding() {
            return None;
        }
        Some(self.lock().receive(message, now))
    }

    pub fn current(&self) -> Channel {
        self.lock().current()
    }

    pub fn view(&self) -> View {
        self.lock().view()
    }

    pub fn unread(&self, channel: Channel) -> u32 {
        self.lock().unread(channel)
    }

    pub fn merged_channels(&self) -> Vec<Channel> {
        self.lock().merged().channels().collect()
    }

    pub fn visible(&self) -> Vec<Entry> {
        self.lock().visible().into_iter().cloned().collect()
    }

    /// Switches tabs and replays. Returns false, without touching the surface,
    /// when `channel` already was current.
    pub fn switch_to(&self, channel: Channel, surface: &mut dyn ChatSurface) -> bool {
        if !self.lock().set_current(channel) {
            return false;
        }
        self.rebuild(surface);
        true
    }

    pub fn toggle_merged(&self, channel: Channel, surface: &mut dyn ChatSurface) {
        self.lock().toggle_merged(channel);
        self.rebuild(surface);
    }

    pub fn set_show_system_in_all_tabs(&self, show: bool, surface: &mut dyn ChatSurface) {
        self.lock().set_show_system_in_all_tabs(show);
        self.rebuild(surface);
    }

    /// Clears `surface` and replays every entry the current view shows.
    /// A surface that cannot be cleared keeps its old lines; the replay still
    /// runs. Returns the number of entries replayed.
    pub fn rebuild(&self, surface: &mut dyn ChatSurface) -> usize {
        self.rebuilding.store(true, Ordering::SeqCst);
        let _guard = RebuildGuard(&self.rebuilding);

        if let Err(error) = surface.clear() {
            warn!(%error, "chat surface not cleared; lines may repeat until restart");
        }

        let entries: Vec<Entry> = {
            let mut state = self.lock();
            state.mark_view_read();
            state.visible().into_iter().cloned().collect()
        };
        for entry in &entries {
            surface.show(entry);
        }
        debug!(replayed = entries.len(), "chat rebuilt");
        entries.len()
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tests/replay_tests.rs"]
mod tests;
