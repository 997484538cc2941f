use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use chrono::{TimeZone, Utc};
use shared::{
    codec::{detect, Envelope, Marker},
    domain::{Dimension, Location, MuteRecord, PlayerId, Position},
};
use storage::{ChatLogRecord, DeathLogRecord, ModerationAction};

use crate::{
    collaborators::{
        ChatLogSink, CommandError, CommandExecutor, DeliveryError, ManualClock, NoPartyPlugin,
        NoPermissionPlugin, NoPrefixPlugin, Transport,
    },
    router::{ChatRouter, RouterDeps},
    settings::ChatSettings,
    world::PlayerSnapshot,
};

#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(PlayerId, Envelope)>>,
    pub down: Mutex<HashSet<PlayerId>>,
}

impl RecordingTransport {
    pub fn take(&self) -> Vec<(PlayerId, Envelope)> {
        std::mem::take(&mut *self.sent.lock().expect("lock"))
    }

    pub fn to(&self, player: PlayerId) -> Vec<Envelope> {
        self.sent
            .lock()
            .expect("lock")
            .iter()
            .filter(|(to, _)| *to == player)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn receivers_of(&self, marker: Marker) -> HashSet<PlayerId> {
        self.sent
            .lock()
            .expect("lock")
            .iter()
            .filter(|(_, message)| detect(message) == Some(marker))
            .map(|(to, _)| *to)
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn send_system(&self, to: PlayerId, message: &Envelope) -> Result<(), DeliveryError> {
        if self.down.lock().expect("lock").contains(&to) {
            return Err(DeliveryError::NotConnected(to));
        }
        self.sent.lock().expect("lock").push((to, message.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub chats: Mutex<Vec<ChatLogRecord>>,
    pub deaths: Mutex<Vec<DeathLogRecord>>,
    pub mutes: Mutex<Vec<MuteRecord>>,
    pub moderation: Mutex<Vec<ModerationAction>>,
}

impl ChatLogSink for RecordingSink {
    fn log_chat(&self, record: ChatLogRecord) {
        self.chats.lock().expect("lock").push(record);
    }

    fn log_death(&self, record: DeathLogRecord) {
        self.deaths.lock().expect("lock").push(record);
    }

    fn persist_mute(&self, mute: MuteRecord) {
        self.mutes.lock().expect("lock").push(mute);
    }

    fn forget_mute(&self, target: PlayerId) {
        self.mutes.lock().expect("lock").retain(|m| m.target != target);
    }

    fn log_moderation(&self, action: ModerationAction) {
        self.moderation.lock().expect("lock").push(action);
    }
}

#[derive(Default)]
pub struct RecordingDelegate {
    pub commands: Mutex<Vec<(PlayerId, String)>>,
    pub fail: bool,
}

impl CommandExecutor for RecordingDelegate {
    fn execute_as(&self, player: &PlayerSnapshot, command: &str) -> Result<(), CommandError> {
        self.commands
            .lock()
            .expect("lock")
            .push((player.id, command.to_string()));
        if self.fail {
            return Err(CommandError {
                command: command.to_string(),
                reason: "party plugin offline".into(),
            });
        }
        Ok(())
    }
}

pub struct Harness {
    pub router: ChatRouter,
    pub transport: Arc<RecordingTransport>,
    pub sink: Arc<RecordingSink>,
    pub delegate: Arc<RecordingDelegate>,
    pub clock: Arc<ManualClock>,
}

pub fn harness() -> Harness {
    harness_with(ChatSettings::default(), RecordingDelegate::default())
}

pub fn harness_with(settings: ChatSettings, delegate: RecordingDelegate) -> Harness {
    let transport = Arc::new(RecordingTransport::default());
    let sink = Arc::new(RecordingSink::default());
    let delegate = Arc::new(delegate);
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp"),
    ));
    let router = ChatRouter::new(RouterDeps {
        settings,
        permissions: Arc::new(NoPermissionPlugin),
        prefixes: Arc::new(NoPrefixPlugin),
        parties: Arc::new(NoPartyPlugin),
        clan_delegate: delegate.clone(),
        transport: transport.clone(),
        chat_log: sink.clone(),
        clock: clock.clone(),
        spy_store: None,
    });
    Harness {
        router,
        transport,
        sink,
        delegate,
        clock,
    }
}

pub fn player(name: &str, x: f64) -> PlayerSnapshot {
    PlayerSnapshot::new(
        PlayerId::new_random(),
        name,
        Location::new(Dimension::overworld(), Position::new(x, 64.0, 0.0)),
    )
}

pub fn admin(name: &str, x: f64) -> PlayerSnapshot {
    player(name, x).with_permission_level(2)
}

pub fn in_nether(mut snapshot: PlayerSnapshot) -> PlayerSnapshot {
    snapshot.location.dimension = Dimension::new("minecraft:the_nether");
    snapshot
}
