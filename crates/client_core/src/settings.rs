use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use shared::{domain::PlayerId, parser::DEFAULT_SWITCH_KEY};

pub const SETTINGS_FILE: &str = "client.json";
pub const STATE_FILE: &str = "client-state.json";
const APP_DIR: &str = "multichat";

/// Settings the player edits by hand. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientSettings {
    pub server_url: String,
    pub player_name: String,
    pub player_id: Option<PlayerId>,
    pub show_system_in_all_tabs: bool,
    pub switch_key: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8443".into(),
            player_name: String::new(),
            player_id: None,
            show_system_in_all_tabs: true,
            switch_key: DEFAULT_SWITCH_KEY.into(),
        }
    }
}

impl ClientSettings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("invalid settings in {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }
}

/// `<config dir>/multichat`, or the working directory when the platform has none.
pub fn default_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}
