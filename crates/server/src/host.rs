//! The reference host's side of the collaborator traits: who is connected,
//! how frames reach them, who counts as an admin and how clan chat is carried.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, PoisonError, RwLock},
};

use server_core::{
    collaborators::{
        Capability, CommandError, CommandExecutor, DeliveryError, PermissionProvider, Transport,
    },
    OnlinePlayers, PlayerSnapshot,
};
use shared::{
    codec::Envelope,
    color::NamedColor,
    domain::{Location, PlayerId},
    protocol::ServerFrame,
    text::RichText,
};
use tokio::sync::mpsc;
use tracing::debug;

struct Connection {
    snapshot: PlayerSnapshot,
    frames: mpsc::UnboundedSender<ServerFrame>,
}

/// Connected players and the outbound frame queue of each.
#[derive(Default)]
pub struct PlayerRegistry {
    connections: RwLock<HashMap<PlayerId, Connection>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the player, replacing an older connection with the same id.
    pub fn register(&self, snapshot: PlayerSnapshot) -> mpsc::UnboundedReceiver<ServerFrame> {
        let (frames, rx) = mpsc::unbounded_channel();
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(snapshot.id, Connection { snapshot, frames });
        rx
    }

    pub fn unregister(&self, player: PlayerId) -> Option<PlayerSnapshot> {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&player)
            .map(|connection| connection.snapshot)
    }

    pub fn snapshot(&self, player: PlayerId) -> Option<PlayerSnapshot> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&player)
            .map(|connection| connection.snapshot.clone())
    }

    pub fn update_location(&self, player: PlayerId, location: Location) {
        if let Some(connection) = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&player)
        {
            connection.snapshot.location = location;
        }
    }

    pub fn online(&self) -> OnlinePlayers {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|connection| connection.snapshot.clone())
            .collect()
    }

    pub fn send_frame(&self, player: PlayerId, frame: ServerFrame) -> Result<(), DeliveryError> {
        let connections = self
            .connections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let connection = connections
            .get(&player)
            .ok_or(DeliveryError::NotConnected(player))?;
        connection
            .frames
            .send(frame)
            .map_err(|_| DeliveryError::Closed {
                player,
                reason: "outbound queue closed".into(),
            })
    }
}

impl Transport for PlayerRegistry {
    fn send_system(&self, to: PlayerId, message: &Envelope) -> Result<(), DeliveryError> {
        self.send_frame(
            to,
            ServerFrame::SystemMessage {
                message: message.clone(),
            },
        )
    }
}

/// Configured admins hold every node; for everyone else the operator level decides.
pub struct StaticPermissions {
    admins: HashSet<PlayerId>,
}

impl StaticPermissions {
    pub fn new(admins: impl IntoIterator<Item = PlayerId>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }
}

impl PermissionProvider for StaticPermissions {
    fn has_permission(&self, player: PlayerId, _node: &str) -> Capability<bool> {
        if self.admins.contains(&player) {
            Capability::Present(true)
        } else {
            Capability::Absent
        }
    }
}

/// Stand-in for a party plugin: `<clan command> <text>` is delivered as a
/// `[Party]` line to the sender's team, or back to the sender alone.
pub struct TeamClanDelegate {
    registry: Arc<PlayerRegistry>,
    command: String,
}

impl TeamClanDelegate {
    pub fn new(registry: Arc<PlayerRegistry>, command: impl Into<String>) -> Self {
        Self {
            registry,
            command: command.into(),
        }
    }

    pub fn handles(&self, line: &str) -> bool {
        line.split_whitespace()
            .next()
            .is_some_and(|name| name.eq_ignore_ascii_case(&self.command))
    }
}

impl CommandExecutor for TeamClanDelegate {
    fn execute_as(&self, player: &PlayerSnapshot, command: &str) -> Result<(), CommandError> {
        let text = command
            .trim()
            .split_once(char::is_whitespace)
            .filter(|(name, _)| name.eq_ignore_ascii_case(&self.command))
            .map(|(_, text)| text.trim())
            .ok_or_else(|| CommandError {
                command: command.to_string(),
                reason: format!("usage: {} <message>", self.command),
            })?;
        if text.is_empty() {
            return Err(CommandError {
                command: command.to_string(),
                reason: "empty message".into(),
            });
        }

        let online = self.registry.online();
        let members: Vec<PlayerId> = match &player.team {
            Some(team) => online
                .iter()
                .filter(|other| other.team.as_ref() == Some(team))
                .map(|other| other.id)
                .collect(),
            None => vec![player.id],
        };

        let line = Envelope::plain(
            RichText::empty()
                .append(RichText::literal("[Party] ").with_color(NamedColor::DarkAqua))
                .append(RichText::literal(format!("{}: ", player.name)).with_color(NamedColor::Aqua))
                .append(RichText::literal(text)),
        );
        for member in members {
            if let Err(error) = self.registry.send_system(member, &line) {
                debug!(%error, "party line not delivered");
            }
        }
        Ok(())
    }
}
