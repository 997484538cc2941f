//! Tab labels, colors and the switch key, local defaults overridden by the server.

use std::collections::BTreeMap;

use shared::{parser::DEFAULT_SWITCH_KEY, protocol::UiConfigSync, Channel, Rgb};

const FALLBACK_TAB_COLOR: Rgb = Rgb::new(0xAAAAAA);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiConfig {
    switch_key: String,
    tab_labels: BTreeMap<Channel, String>,
    tab_colors: BTreeMap<Channel, Rgb>,
    admin_tab_allowed: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self::local(DEFAULT_SWITCH_KEY)
    }
}

impl UiConfig {
    /// Local defaults. The admin tab stays hidden until a server says otherwise.
    pub fn local(switch_key: &str) -> Self {
        let defaults = UiConfigSync::default();
        let switch_key = if switch_key.trim().is_empty() {
            DEFAULT_SWITCH_KEY.to_string()
        } else {
            switch_key.to_string()
        };
        Self {
            switch_key,
            tab_labels: defaults.tab_labels,
            tab_colors: defaults.tab_colors,
            admin_tab_allowed: false,
        }
    }

    pub fn apply_sync(&mut self, sync: &UiConfigSync) {
        if !sync.switch_key.trim().is_empty() {
            self.switch_key = sync.switch_key.clone();
        }
        self.tab_labels
            .extend(sync.tab_labels.iter().map(|(channel, label)| (*channel, label.clone())));
        self.tab_colors.extend(sync.tab_colors.iter().map(|(channel, color)| (*channel, *color)));
        self.admin_tab_allowed = sync.admin_tab_allowed;
    }

    pub fn switch_key(&self) -> &str {
        &self.switch_key
    }

    pub fn is_admin_tab_allowed(&self) -> bool {
        self.admin_tab_allowed
    }

    pub fn tab_label(&self, channel: Channel) -> &str {
        self.tab_labels
            .get(&channel)
            .map(String::as_str)
            .unwrap_or(channel.short_tag())
    }

    pub fn tab_color(&self, channel: Channel) -> Rgb {
        self.tab_colors
            .get(&channel)
            .copied()
            .unwrap_or(FALLBACK_TAB_COLOR)
    }

    pub fn visible_tabs(&self) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|channel| *channel != Channel::Admin || self.admin_tab_allowed)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_tab_hidden_until_synced() {
        let mut config = UiConfig::default();
        assert!(!config.visible_tabs().contains(&Channel::Admin));
        assert_eq!(config.tab_label(Channel::Trade), "T");

        let mut sync = UiConfigSync {
            switch_key: "%".into(),
            admin_tab_allowed: true,
            ..UiConfigSync::default()
        };
        sync.tab_labels.insert(Channel::Trade, "$".into());
        sync.tab_colors.insert(Channel::Local, Rgb::new(0x00FF00));
        config.apply_sync(&sync);

        assert_eq!(config.switch_key(), "%");
        assert_eq!(config.tab_label(Channel::Trade), "$");
        assert_eq!(config.tab_color(Channel::Local), Rgb::new(0x00FF00));
        assert_eq!(config.visible_tabs().len(), 5);
    }

    #[test]
    fn blank_switch_key_keeps_the_current_one() {
        let mut config = UiConfig::local("  ");
        assert_eq!(config.switch_key(), "$");
        config.apply_sync(&UiConfigSync {
            switch_key: String::new(),
            ..UiConfigSync::default()
        });
        assert_eq!(config.switch_key(), "$");
    }
}
