use std::sync::Arc;

use crate::{
    collaborators::{Capability, PermissionProvider},
    world::PlayerSnapshot,
};

pub mod nodes {
    pub const ADMIN_CHAT: &str = "multichat.adminchat";
    pub const SPY: &str = "multichat.spy";
    pub const MUTE: &str = "multichat.mute";
    pub const UNMUTE: &str = "multichat.unmute";
    pub const MUTED: &str = "multichat.muted";
    pub const MUTE_LIST: &str = "multichat.mutelist";
}

pub const DEFAULT_FALLBACK_LEVEL: u8 = 2;

/// Permission checks with a vanilla operator-level fallback when no
/// permission plugin answers.
#[derive(Clone)]
pub struct Permissions {
    provider: Arc<dyn PermissionProvider>,
    fallback_level: u8,
}

impl Permissions {
    pub fn new(provider: Arc<dyn PermissionProvider>, fallback_level: u8) -> Self {
        Self {
            provider,
            fallback_level: fallback_level.min(4),
        }
    }

    pub fn has(&self, player: &PlayerSnapshot, node: &str) -> bool {
        match self.provider.has_permission(player.id, node) {
            Capability::Present(granted) => granted,
            Capability::Absent => player.permission_level >= self.fallback_level,
        }
    }
}
