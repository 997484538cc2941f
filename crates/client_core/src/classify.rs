//! Decides where an inbound system message belongs.

use chrono::{DateTime, Duration, Utc};
use shared::{
    codec::{detect, Envelope, Marker},
    heuristics::{
        channel_from_rendered_text, is_private_message, is_waypoint_share, looks_like_party_chat,
        share_dedupe_key, RecentKeys,
    },
    Channel,
};

pub const SHARE_DEDUPE_WINDOW_MS: i64 = 1200;
pub const SHARE_DEDUPE_MEMORY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Channel(Channel),
    /// Visible according to the "system in all tabs" setting.
    System,
    /// Visible in every tab.
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Store(EntryKind),
    /// A repeated waypoint share; neither stored nor shown.
    Duplicate,
}

pub struct Classifier {
    recent_shares: RecentKeys,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            recent_shares: RecentKeys::new(
                Duration::milliseconds(SHARE_DEDUPE_WINDOW_MS),
                SHARE_DEDUPE_MEMORY,
            ),
        }
    }

    /// `current` is the tab the user is looking at; spy copies land there.
    pub fn classify(
        &mut self,
        message: &Envelope,
        current: Channel,
        now: DateTime<Utc>,
    ) -> Classification {
        let marker = detect(message);

        if is_waypoint_share(&message.body) {
            let key = share_dedupe_key(&message.body);
            if self.recent_shares.check_and_mark(&key, now) {
                return Classification::Duplicate;
            }
            let channel = match marker {
                Some(Marker::Channel(channel)) => channel,
                _ => Channel::Global,
            };
            return Classification::Store(EntryKind::Channel(channel));
        }

        let kind = match marker {
            Some(Marker::ForcePrivate) => EntryKind::Private,
            Some(Marker::Spy) => EntryKind::Channel(current),
            Some(Marker::AdminMirror) => EntryKind::Channel(Channel::Admin),
            Some(Marker::Channel(channel)) => EntryKind::Channel(channel),
            None => classify_unmarked(message),
        };
        Classification::Store(kind)
    }
}

fn classify_unmarked(message: &Envelope) -> EntryKind {
    let plain = message.body.plain_text();
    if looks_like_party_chat(&plain) {
        return EntryKind::Channel(Channel::Clan);
    }
    if let Some(channel) = channel_from_rendered_text(&plain) {
        return EntryKind::Channel(channel);
    }
    if is_private_message(&message.body) {
        return EntryKind::Private;
    }
    // Clickable notices would vanish on the next tab switch otherwise.
    if message.body.first_command_click().is_some() {
        return EntryKind::Private;
    }
    EntryKind::System
}
