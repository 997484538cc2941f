use std::{
    collections::HashSet,
    sync::{PoisonError, RwLock},
};

use shared::domain::PlayerId;

use crate::{
    perms::{nodes, Permissions},
    world::{OnlinePlayers, PlayerSnapshot},
};

/// Per-admin opt-out of the admin mirror. Admins see the mirror unless they
/// turned it off; losing the permission clears the opt-out.
pub struct AdminMirrorState {
    perms: Permissions,
    disabled: RwLock<HashSet<PlayerId>>,
}

impl AdminMirrorState {
    pub fn new(perms: Permissions) -> Self {
        Self {
            perms,
            disabled: RwLock::new(HashSet::new()),
        }
    }

    pub fn is_enabled(&self, player: &PlayerSnapshot) -> bool {
        if !self.perms.has(player, nodes::ADMIN_CHAT) {
            if self.has_opt_out(player.id) {
                self.disabled
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&player.id);
            }
            return false;
        }
        !self.has_opt_out(player.id)
    }

    fn has_opt_out(&self, player: PlayerId) -> bool {
        self.disabled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&player)
    }

    /// Returns the new state, or `None` when the player may not use the mirror.
    pub fn set(&self, player: &PlayerSnapshot, enabled: bool) -> Option<bool> {
        if !self.perms.has(player, nodes::ADMIN_CHAT) {
            return None;
        }
        let mut disabled = self.disabled.write().unwrap_or_else(PoisonError::into_inner);
        if enabled {
            disabled.remove(&player.id);
        } else {
            disabled.insert(player.id);
        }
        Some(enabled)
    }

    pub fn toggle(&self, player: &PlayerSnapshot) -> Option<bool> {
        let next = !self.is_enabled(player);
        self.set(player, next)
    }

    pub fn recipients<'a>(&self, online: &'a OnlinePlayers) -> Vec<&'a PlayerSnapshot> {
        online.iter().filter(|player| self.is_enabled(player)).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use shared::domain::Location;

    use super::*;
    use crate::collaborators::NoPermissionPlugin;

    fn state() -> AdminMirrorState {
        AdminMirrorState::new(Permissions::new(Arc::new(NoPermissionPlugin), 2))
    }

    #[test]
    fn admins_see_mirror_by_default_and_can_opt_out() {
        let mirror = state();
        let admin = PlayerSnapshot::new(PlayerId::new_random(), "Admin", Location::default())
            .with_permission_level(3);
        assert!(mirror.is_enabled(&admin));
        assert_eq!(mirror.toggle(&admin), Some(false));
        assert!(!mirror.is_enabled(&admin));
        assert_eq!(mirror.set(&admin, true), Some(true));
        assert!(mirror.is_enabled(&admin));
    }

    #[test]
    fn non_admins_never_receive_and_cannot_toggle() {
        let mirror = state();
        let player = PlayerSnapshot::new(PlayerId::new_random(), "Player", Location::default());
        assert!(!mirror.is_enabled(&player));
        assert_eq!(mirror.toggle(&player), None);
    }

    #[test]
    fn checking_non_admins_only_reads() {
        let mirror = Arc::new(state());
        let player = PlayerSnapshot::new(PlayerId::new_random(), "Player", Location::default());
        let held = mirror.disabled.read().expect("read");

        let (tx, rx) = std::sync::mpsc::channel();
        let worker = {
            let mirror = mirror.clone();
            std::thread::spawn(move || {
                tx.send(mirror.is_enabled(&player)).expect("send");
            })
        };
        let enabled = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("non-admin check must not wait for the write lock");
        assert!(!enabled);
        drop(held);
        worker.join().expect("join");
    }

    #[test]
    fn losing_permission_clears_opt_out() {
        let mirror = state();
        let mut admin = PlayerSnapshot::new(PlayerId::new_random(), "Admin", Location::default())
            .with_permission_level(2);
        mirror.set(&admin, false);
        admin.permission_level = 0;
        assert!(!mirror.is_enabled(&admin));
        admin.permission_level = 2;
        assert!(mirror.is_enabled(&admin));
    }
}
