use std::collections::BTreeMap;

use serde::Deserialize;
use shared::{channel::Channel, color::Rgb, parser::DEFAULT_SWITCH_KEY, protocol::MAX_SWITCH_KEY_LENGTH};
use tracing::warn;

use crate::perms::DEFAULT_FALLBACK_LEVEL;

/// Chat behaviour knobs, read from the `[chat]` table of the server config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub switch_key: String,
    pub local_radius_blocks: u32,
    pub permission_level: u8,
    pub mutes_enabled: bool,
    pub chat_log_enabled: bool,
    pub include_system_messages: bool,
    pub death_messages_local_only: bool,
    pub death_radius_blocks: u32,
    pub death_log_enabled: bool,
    pub history_max_messages: usize,
    pub history_default_minutes: u32,
    /// Command the CLAN channel is delegated to, e.g. `opm <message>`.
    pub clan_command: String,
    pub tab_labels: BTreeMap<Channel, String>,
    pub tab_colors: BTreeMap<Channel, String>,
    pub text_colors: BTreeMap<Channel, String>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            switch_key: DEFAULT_SWITCH_KEY.to_string(),
            local_radius_blocks: 100,
            permission_level: DEFAULT_FALLBACK_LEVEL,
            mutes_enabled: true,
            chat_log_enabled: true,
            include_system_messages: true,
            death_messages_local_only: true,
            death_radius_blocks: 100,
            death_log_enabled: true,
            history_max_messages: 2000,
            history_default_minutes: 10,
            clan_command: "opm".to_string(),
            tab_labels: BTreeMap::new(),
            tab_colors: BTreeMap::new(),
            text_colors: BTreeMap::new(),
        }
    }
}

impl ChatSettings {
    pub const LOCAL_RADIUS_RANGE: (u32, u32) = (1, 1024);
    pub const DEATH_RADIUS_RANGE: (u32, u32) = (1, 1024);
    pub const HISTORY_MAX_RANGE: (usize, usize) = (100, 20_000);
    pub const HISTORY_MINUTES_RANGE: (u32, u32) = (1, 120);

    /// Replaces out-of-range values with their defaults, warning for each.
    pub fn validated(mut self) -> Self {
        let defaults = ChatSettings::default();

        if !in_range(self.local_radius_blocks, Self::LOCAL_RADIUS_RANGE) {
            warn!(value = self.local_radius_blocks, "chat.local_radius_blocks out of range; using default");
            self.local_radius_blocks = defaults.local_radius_blocks;
        }
        if !in_range(self.death_radius_blocks, Self::DEATH_RADIUS_RANGE) {
            warn!(value = self.death_radius_blocks, "chat.death_radius_blocks out of range; using default");
            self.death_radius_blocks = defaults.death_radius_blocks;
        }
        if !in_range(self.history_max_messages, Self::HISTORY_MAX_RANGE) {
            warn!(value = self.history_max_messages, "chat.history_max_messages out of range; using default");
            self.history_max_messages = defaults.history_max_messages;
        }
        if !in_range(self.history_default_minutes, Self::HISTORY_MINUTES_RANGE) {
            warn!(value = self.history_default_minutes, "chat.history_default_minutes out of range; using default");
            self.history_default_minutes = defaults.history_default_minutes;
        }
        if self.permission_level > 4 {
            warn!(value = self.permission_level, "chat.permission_level out of range; using default");
            self.permission_level = defaults.permission_level;
        }
        let key_len = self.switch_key.trim().chars().count();
        if key_len == 0 || key_len > MAX_SWITCH_KEY_LENGTH {
            warn!(value = %self.switch_key, "chat.switch_key must be 1..=16 chars; using default");
            self.switch_key = defaults.switch_key;
        } else {
            self.switch_key = self.switch_key.trim().to_string();
        }
        if self.clan_command.trim().is_empty() {
            self.clan_command = defaults.clan_command;
        }

        self.tab_labels.retain(|channel, label| {
            let len = label.chars().count();
            let keep = (1..=16).contains(&len);
            if !keep {
                warn!(%channel, "tab label must be 1..=16 chars; using default");
            }
            keep
        });
        for (name, colors) in [("tab_colors", &mut self.tab_colors), ("text_colors", &mut self.text_colors)] {
            colors.retain(|channel, raw| {
                let keep = Rgb::parse(raw).is_some();
                if !keep {
                    warn!(%channel, value = %raw, table = name, "unparseable color; using default");
                }
                keep
            });
        }
        self
    }

    pub fn tab_label(&self, channel: Channel) -> String {
        self.tab_labels
            .get(&channel)
            .cloned()
            .unwrap_or_else(|| channel.short_tag().to_string())
    }

    pub fn tab_color(&self, channel: Channel) -> Rgb {
        self.tab_colors
            .get(&channel)
            .and_then(|raw| Rgb::parse(raw))
            .unwrap_or_else(|| channel.default_tab_color())
    }

    pub fn text_color(&self, channel: Channel) -> Rgb {
        self.text_colors
            .get(&channel)
            .and_then(|raw| Rgb::parse(raw))
            .unwrap_or_else(|| channel.default_text_color())
    }
}

fn in_range<T: PartialOrd>(value: T, (min, max): (T, T)) -> bool {
    value >= min && value <= max
}
