use std::sync::Arc;

use shared::channel::Channel;

use crate::{
    collaborators::{Capability, PartyProvider},
    perms::{nodes, Permissions},
    world::{OnlinePlayers, PlayerSnapshot},
};

/// Per-channel recipient policy.
pub struct RecipientResolver {
    local_radius: u32,
    perms: Permissions,
    parties: Arc<dyn PartyProvider>,
}

impl RecipientResolver {
    pub fn new(local_radius: u32, perms: Permissions, parties: Arc<dyn PartyProvider>) -> Self {
        Self {
            local_radius,
            perms,
            parties,
        }
    }

    pub fn local_radius(&self) -> u32 {
        self.local_radius
    }

    pub fn resolve(
        &self,
        channel: Channel,
        sender: &PlayerSnapshot,
        online: &OnlinePlayers,
    ) -> Vec<PlayerSnapshot> {
        match channel {
            Channel::Global | Channel::Trade => online.iter().cloned().collect(),
            Channel::Admin => online
                .iter()
                .filter(|player| self.perms.has(player, nodes::ADMIN_CHAT))
                .cloned()
                .collect(),
            Channel::Local => within_radius(sender, online, self.local_radius),
            Channel::Clan => self.clan(sender, online),
        }
    }

    /// Party members, else team members, else the sender alone.
    fn clan(&self, sender: &PlayerSnapshot, online: &OnlinePlayers) -> Vec<PlayerSnapshot> {
        let members: Vec<PlayerSnapshot> = match self.parties.online_members(sender.id) {
            Capability::Present(ids) => ids
                .into_iter()
                .filter_map(|id| online.get(id).cloned())
                .collect(),
            Capability::Absent => match &sender.team {
                Some(team) => online
                    .iter()
                    .filter(|player| player.team.as_ref() == Some(team))
                    .cloned()
                    .collect(),
                None => Vec::new(),
            },
        };
        if members.is_empty() {
            vec![sender.clone()]
        } else {
            members
        }
    }
}

/// Online players in the sender's dimension within `radius` blocks, inclusive.
pub fn within_radius(
    sender: &PlayerSnapshot,
    online: &OnlinePlayers,
    radius: u32,
) -> Vec<PlayerSnapshot> {
    let radius = f64::from(radius);
    online
        .iter()
        .filter(|player| sender.location.within(&player.location, radius))
        .cloned()
        .collect()
}
