//! Channels the user chose to read together, kept across sessions.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use shared::Channel;
use tracing::warn;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
    #[serde(default)]
    merged_tabs: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MergedTabs {
    channels: BTreeSet<Channel>,
    store: Option<PathBuf>,
}

impl MergedTabs {
    /// Not persisted anywhere.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Reads the saved set from `path`. A missing or unreadable file starts empty;
    /// unknown channel names are skipped.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let channels = match read_state(&path) {
            Ok(Some(state)) => state
                .merged_tabs
                .iter()
                .filter_map(|name| Channel::from_name(name))
                .collect(),
            Ok(None) => BTreeSet::new(),
            Err(error) => {
                warn!(path = %path.display(), %error, "ignoring unreadable client state");
                BTreeSet::new()
            }
        };
        Self {
            channels,
            store: Some(path),
        }
    }

    pub fn toggle(&mut self, channel: Channel) {
        if !self.channels.remove(&channel) {
            self.channels.insert(channel);
        }
        self.persist();
    }

    pub fn replace_all(&mut self, channels: impl IntoIterator<Item = Channel>) {
        self.channels = channels.into_iter().collect();
        self.persist();
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.channels.contains(&channel)
    }

    /// A merged view needs at least two channels.
    pub fn is_active(&self) -> bool {
        self.channels.len() >= 2
    }

    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.channels.iter().copied()
    }

    fn persist(&self) {
        let Some(path) = &self.store else {
            return;
        };
        if let Err(error) = write_state(path, &self.channels) {
            warn!(path = %path.display(), %error, "failed to save merged tabs");
        }
    }
}

fn read_state(path: &Path) -> anyhow::Result<Option<PersistedState>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let state = serde_json::from_str(&raw).context("invalid client state json")?;
    Ok(Some(state))
}

fn write_state(path: &Path, channels: &BTreeSet<Channel>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let state = PersistedState {
        merged_tabs: channels.iter().map(|channel| channel.name().to_string()).collect(),
    };
    let json = serde_json::to_string_pretty(&state)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
