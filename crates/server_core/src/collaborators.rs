//! Host-provided services the router depends on.
//!
//! Optional integrations (permissions, prefixes, parties) answer with
//! [`Capability::Absent`] when the backing plugin is not installed; the router
//! then falls back to built-in behaviour.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use shared::{
    codec::Envelope,
    color::Rgb,
    domain::{MuteRecord, PlayerId},
    text::RichText,
};
use storage::{ChatLogRecord, DeathLogRecord, LogJob, LogWriter, ModerationAction};
use thiserror::Error;

use crate::world::PlayerSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability<T> {
    Present(T),
    Absent,
}

impl<T> Capability<T> {
    pub fn present(self) -> Option<T> {
        match self {
            Capability::Present(value) => Some(value),
            Capability::Absent => None,
        }
    }
}

impl<T> From<Option<T>> for Capability<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Capability::Absent, Capability::Present)
    }
}

pub trait PermissionProvider: Send + Sync {
    fn has_permission(&self, player: PlayerId, node: &str) -> Capability<bool>;
}

pub trait PrefixProvider: Send + Sync {
    fn prefix(&self, player: PlayerId) -> Capability<RichText>;
    fn name_color(&self, player: PlayerId) -> Capability<Rgb>;
}

pub trait PartyProvider: Send + Sync {
    /// Online members of the player's party, the player included.
    fn online_members(&self, player: PlayerId) -> Capability<Vec<PlayerId>>;
}

#[derive(Debug, Error)]
#[error("command '{command}' failed: {reason}")]
pub struct CommandError {
    pub command: String,
    pub reason: String,
}

pub trait CommandExecutor: Send + Sync {
    /// Runs `command` (no leading `/`) as if `player` had typed it.
    fn execute_as(&self, player: &PlayerSnapshot, command: &str) -> Result<(), CommandError>;
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("player {0} is not connected")]
    NotConnected(PlayerId),
    #[error("transport closed for {player}: {reason}")]
    Closed { player: PlayerId, reason: String },
}

pub trait Transport: Send + Sync {
    fn send_system(&self, to: PlayerId, message: &Envelope) -> Result<(), DeliveryError>;
}

/// Fire-and-forget persistence of chat, death and moderation events.
pub trait ChatLogSink: Send + Sync {
    fn log_chat(&self, record: ChatLogRecord);
    fn log_death(&self, record: DeathLogRecord);
    fn persist_mute(&self, mute: MuteRecord);
    fn forget_mute(&self, target: PlayerId);
    fn log_moderation(&self, action: ModerationAction);
}

impl ChatLogSink for LogWriter {
    fn log_chat(&self, record: ChatLogRecord) {
        self.submit(LogJob::Chat(record));
    }

    fn log_death(&self, record: DeathLogRecord) {
        self.submit(LogJob::Death(record));
    }

    fn persist_mute(&self, mute: MuteRecord) {
        self.submit(LogJob::UpsertMute(mute));
    }

    fn forget_mute(&self, target: PlayerId) {
        self.submit(LogJob::DeleteMute(target));
    }

    fn log_moderation(&self, action: ModerationAction) {
        self.submit(LogJob::Moderation(action));
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct NoPermissionPlugin;

impl PermissionProvider for NoPermissionPlugin {
    fn has_permission(&self, _player: PlayerId, _node: &str) -> Capability<bool> {
        Capability::Absent
    }
}

pub struct NoPrefixPlugin;

impl PrefixProvider for NoPrefixPlugin {
    fn prefix(&self, _player: PlayerId) -> Capability<RichText> {
        Capability::Absent
    }

    fn name_color(&self, _player: PlayerId) -> Capability<Rgb> {
        Capability::Absent
    }
}

pub struct NoPartyPlugin;

impl PartyProvider for NoPartyPlugin {
    fn online_members(&self, _player: PlayerId) -> Capability<Vec<PlayerId>> {
        Capability::Absent
    }
}
