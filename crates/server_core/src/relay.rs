//! Outbound system messages the router did not build: server broadcasts,
//! plugin notices, waypoint shares from map mods.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Duration, Utc};
use shared::{
    channel::Channel,
    codec::{self, Envelope, Marker},
    domain::PlayerId,
    heuristics::{is_waypoint_share, share_dedupe_key, RecentKeys},
};
use storage::ChatLogRecord;
use tracing::debug;

use crate::{
    active::ActiveChannels,
    collaborators::{ChatLogSink, Clock, DeliveryError, Transport},
    delivery::system_logging_suppressed,
    world::{OnlinePlayers, PlayerSnapshot},
};

pub const SYSTEM_CHANNEL: &str = "SYSTEM";

const SHARE_WINDOW_MS: i64 = 1200;
const SHARE_MEMORY: usize = 64;
const PENDING_SHARE_MS: i64 = 3000;
const SYSTEM_LOG_DEDUPE_MS: i64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered { marker: Option<Marker> },
    SuppressedDuplicate,
}

struct PendingShare {
    channel: Channel,
    at: DateTime<Utc>,
}

pub struct SystemRelay {
    transport: Arc<dyn Transport>,
    log: Arc<dyn ChatLogSink>,
    active: Arc<ActiveChannels>,
    clock: Arc<dyn Clock>,
    log_system: bool,
    shares: Mutex<HashMap<PlayerId, RecentKeys>>,
    last_logged: Mutex<HashMap<PlayerId, (String, DateTime<Utc>)>>,
    pending_share: Mutex<Option<PendingShare>>,
}

impl SystemRelay {
    pub fn new(
        transport: Arc<dyn Transport>,
        log: Arc<dyn ChatLogSink>,
        active: Arc<ActiveChannels>,
        clock: Arc<dyn Clock>,
        log_system: bool,
    ) -> Self {
        Self {
            transport,
            log,
            active,
            clock,
            log_system,
            shares: Mutex::new(HashMap::new()),
            last_logged: Mutex::new(HashMap::new()),
            pending_share: Mutex::new(None),
        }
    }

    /// Remembers that `sharer` just ran a waypoint share command, for shares
    /// whose text does not name the sharer.
    pub fn note_share_command(&self, sharer: &PlayerSnapshot) {
        let channel = self.active.get(sharer.id);
        *self
            .pending_share
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(PendingShare {
            channel,
            at: self.clock.now(),
        });
    }

    pub fn send(
        &self,
        recipient: &PlayerSnapshot,
        mut message: Envelope,
        online: &OnlinePlayers,
    ) -> Result<RelayOutcome, DeliveryError> {
        let now = self.clock.now();

        if is_waypoint_share(&message.body) {
            let key = share_dedupe_key(&message.body);
            let duplicate = self
                .shares
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(recipient.id)
                .or_insert_with(|| {
                    RecentKeys::new(Duration::milliseconds(SHARE_WINDOW_MS), SHARE_MEMORY)
                })
                .check_and_mark(&key, now);
            if duplicate {
                debug!(recipient = %recipient.name, "suppressed duplicate waypoint share");
                return Ok(RelayOutcome::SuppressedDuplicate);
            }
            if codec::detect(&message).is_none() {
                if let Some(channel) = self.share_channel(&message, online, now) {
                    message.marker = Some(Marker::Channel(channel));
                }
            }
        }

        if self.log_system && !system_logging_suppressed() {
            self.log_once(recipient, &message, now);
        }

        self.transport.send_system(recipient.id, &message)?;
        Ok(RelayOutcome::Delivered {
            marker: message.marker,
        })
    }

    pub fn forget(&self, player: PlayerId) {
        self.shares
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&player);
        self.last_logged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&player);
    }

    /// Active channel of the sharer named in the text or click command, else
    /// of a share command seen in the last few seconds.
    fn share_channel(
        &self,
        message: &Envelope,
        online: &OnlinePlayers,
        now: DateTime<Utc>,
    ) -> Option<Channel> {
        let text = message.body.plain_text().to_lowercase();
        let command = message
            .body
            .first_command_click()
            .unwrap_or_default()
            .to_lowercase();
        let sharer = online
            .iter()
            .filter(|player| {
                let name = player.name.to_lowercase();
                !name.is_empty() && (text.contains(&name) || command.contains(&name))
            })
            .max_by_key(|player| player.name.len());
        if let Some(sharer) = sharer {
            return Some(self.active.get(sharer.id));
        }

        let pending = self
            .pending_share
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        pending
            .as_ref()
            .filter(|share| now - share.at <= Duration::milliseconds(PENDING_SHARE_MS))
            .map(|share| share.channel)
    }

    fn log_once(&self, recipient: &PlayerSnapshot, message: &Envelope, now: DateTime<Utc>) {
        let text = message.body.plain_text();
        if text.trim().is_empty() {
            return;
        }
        {
            let mut last = self
                .last_logged
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some((previous, at)) = last.get(&recipient.id) {
                if *previous == text && now - *at < Duration::milliseconds(SYSTEM_LOG_DEDUPE_MS) {
                    return;
                }
            }
            last.insert(recipient.id, (text.clone(), now));
        }
        self.log.log_chat(ChatLogRecord {
            at: now,
            channel: SYSTEM_CHANNEL.to_string(),
            username: recipient.name.clone(),
            player_id: recipient.id,
            message: text,
            dimension: recipient.location.dimension.to_string(),
            block: recipient.location.position.block(),
        });
    }
}
