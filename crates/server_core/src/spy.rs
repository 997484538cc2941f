use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shared::domain::PlayerId;
use tracing::warn;

use crate::{
    perms::{nodes, Permissions},
    world::{OnlinePlayers, PlayerSnapshot},
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SpyFile {
    #[serde(default)]
    enabled: BTreeSet<PlayerId>,
}

/// Moderators who receive copies of channel traffic they are not part of.
/// Opt-in, gated by `multichat.spy`, optionally persisted as JSON.
pub struct SpyState {
    perms: Permissions,
    enabled: RwLock<BTreeSet<PlayerId>>,
    store: Option<PathBuf>,
}

impl SpyState {
    pub fn in_memory(perms: Permissions) -> Self {
        Self {
            perms,
            enabled: RwLock::new(BTreeSet::new()),
            store: None,
        }
    }

    /// Loads the enabled set from `path`; a missing or unreadable file starts empty.
    pub fn load(perms: Permissions, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let enabled = match read_spy_file(&path) {
            Ok(file) => file.enabled,
            Err(error) => {
                if path.exists() {
                    warn!(%error, path = %path.display(), "failed to read spy state; starting empty");
                }
                BTreeSet::new()
            }
        };
        Self {
            perms,
            enabled: RwLock::new(enabled),
            store: Some(path),
        }
    }

    pub fn is_enabled(&self, player: &PlayerSnapshot) -> bool {
        let contained = self
            .enabled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&player.id);
        if !contained {
            return false;
        }
        if !self.perms.has(player, nodes::SPY) {
            self.enabled
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&player.id);
            self.save();
            return false;
        }
        true
    }

    /// Returns the new state, or `None` when the player lacks permission.
    pub fn set(&self, player: &PlayerSnapshot, enabled: bool) -> Option<bool> {
        if !self.perms.has(player, nodes::SPY) {
            return None;
        }
        {
            let mut set = self.enabled.write().unwrap_or_else(PoisonError::into_inner);
            if enabled {
                set.insert(player.id);
            } else {
                set.remove(&player.id);
            }
        }
        self.save();
        Some(enabled)
    }

    pub fn toggle(&self, player: &PlayerSnapshot) -> Option<bool> {
        let next = !self.is_enabled(player);
        self.set(player, next)
    }

    pub fn recipients<'a>(&self, online: &'a OnlinePlayers) -> Vec<&'a PlayerSnapshot> {
        online.iter().filter(|player| self.is_enabled(player)).collect()
    }

    pub fn enabled_count(&self) -> usize {
        self.enabled.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn save(&self) {
        let Some(path) = &self.store else {
            return;
        };
        let file = SpyFile {
            enabled: self
                .enabled
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        };
        if let Err(error) = write_spy_file(path, &file) {
            warn!(%error, path = %path.display(), "failed to persist spy state");
        }
    }
}

fn read_spy_file(path: &Path) -> Result<SpyFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid spy state in {}", path.display()))
}

fn write_spy_file(path: &Path, file: &SpyFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let raw = serde_json::to_string_pretty(file)?;
    fs::write(path, raw).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use shared::domain::Location;

    use super::*;
    use crate::collaborators::NoPermissionPlugin;

    fn perms() -> Permissions {
        Permissions::new(Arc::new(NoPermissionPlugin), 2)
    }

    fn moderator() -> PlayerSnapshot {
        PlayerSnapshot::new(PlayerId::new_random(), "Mod", Location::default()).with_permission_level(2)
    }

    #[test]
    fn toggle_requires_permission() {
        let spy = SpyState::in_memory(perms());
        let player = PlayerSnapshot::new(PlayerId::new_random(), "Player", Location::default());
        assert_eq!(spy.toggle(&player), None);
        let moderator = moderator();
        assert_eq!(spy.toggle(&moderator), Some(true));
        assert!(spy.is_enabled(&moderator));
        assert_eq!(spy.toggle(&moderator), Some(false));
    }

    #[test]
    fn losing_permission_evicts() {
        let spy = SpyState::in_memory(perms());
        let mut moderator = moderator();
        spy.set(&moderator, true);
        moderator.permission_level = 0;
        assert!(!spy.is_enabled(&moderator));
        moderator.permission_level = 2;
        assert!(!spy.is_enabled(&moderator));
        assert_eq!(spy.enabled_count(), 0);
    }

    #[test]
    fn persists_across_reload() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config").join("spy.json");
        let moderator = moderator();

        let spy = SpyState::load(perms(), &path);
        spy.set(&moderator, true);

        let raw = fs::read_to_string(&path).expect("file");
        let json: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(json["enabled"][0], serde_json::json!(moderator.id.to_string()));

        let reloaded = SpyState::load(perms(), &path);
        assert!(reloaded.is_enabled(&moderator));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("spy.json");
        fs::write(&path, "{not json").expect("write");
        let spy = SpyState::load(perms(), &path);
        assert_eq!(spy.enabled_count(), 0);
    }
}
