use shared::{channel::Channel, protocol::UiConfigSync};

use crate::settings::ChatSettings;

/// The per-client UI configuration pushed right after join.
pub fn ui_config(settings: &ChatSettings, admin_tab_allowed: bool) -> UiConfigSync {
    UiConfigSync {
        switch_key: settings.switch_key.clone(),
        tab_labels: Channel::ALL
            .into_iter()
            .map(|channel| (channel, settings.tab_label(channel)))
            .collect(),
        tab_colors: Channel::ALL
            .into_iter()
            .map(|channel| (channel, settings.tab_color(channel)))
            .collect(),
        admin_tab_allowed,
    }
}

#[cfg(test)]
mod tests {
    use shared::color::Rgb;

    use super::*;

    #[test]
    fn carries_overrides_and_defaults() {
        let mut settings = ChatSettings::default();
        settings.switch_key = "%".into();
        settings.tab_labels.insert(Channel::Trade, "$".into());
        settings.tab_colors.insert(Channel::Local, "#00ff00".into());

        let sync = ui_config(&settings.validated(), true);
        assert_eq!(sync.switch_key, "%");
        assert_eq!(sync.tab_labels[&Channel::Trade], "$");
        assert_eq!(sync.tab_labels[&Channel::Global], "G");
        assert_eq!(sync.tab_colors[&Channel::Local], Rgb::new(0x00ff00));
        assert!(sync.admin_tab_allowed);
        assert!(sync.validate().is_ok());
    }
}
