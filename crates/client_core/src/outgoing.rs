//! Rewrites what the player typed before it leaves the client.

use shared::{
    parser::{parse_outgoing, Selector},
    protocol::MAX_CHAT_LENGTH,
    Channel,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Nothing worth sending.
    Empty,
    /// A command line without its leading `/`.
    Command(String),
    Chat { text: String, truncated: bool },
}

/// Commands pass through untouched. Lines with an explicit selector, `!`
/// included, go out as typed so the server applies the same precedence.
/// Otherwise the selector of `current` is prepended.
pub fn prepare_outgoing(raw: &str, current: Channel, switch_key: &str) -> Outgoing {
    if raw.trim().is_empty() {
        return Outgoing::Empty;
    }
    if let Some(command) = raw.strip_prefix('/') {
        return Outgoing::Command(command.to_string());
    }

    let parsed = parse_outgoing(raw, switch_key);
    if parsed.body.trim().is_empty() {
        return Outgoing::Empty;
    }
    let text = match parsed.selector {
        Selector::Bang | Selector::SwitchKey | Selector::Prefix => raw.to_string(),
        Selector::Default if current == Channel::Global => raw.to_string(),
        Selector::Default => format!("{}{raw}", current.primary_prefix()),
    };
    let (text, truncated) = clamp(text);
    Outgoing::Chat { text, truncated }
}

fn clamp(text: String) -> (String, bool) {
    match text.char_indices().nth(MAX_CHAT_LENGTH) {
        Some((cut, _)) => (text[..cut].to_string(), true),
        None => (text, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(text: &str) -> Outgoing {
        Outgoing::Chat {
            text: text.into(),
            truncated: false,
        }
    }

    #[test]
    fn commands_and_blank_lines() {
        assert_eq!(
            prepare_outgoing("/mute Bob 5m", Channel::Local, "$"),
            Outgoing::Command("mute Bob 5m".into())
        );
        assert_eq!(prepare_outgoing("   ", Channel::Local, "$"), Outgoing::Empty);
        assert_eq!(prepare_outgoing("! ", Channel::Local, "$"), Outgoing::Empty);
        assert_eq!(prepare_outgoing("#l ", Channel::Trade, "$"), Outgoing::Empty);
    }

    #[test]
    fn current_channel_is_prefixed_unless_explicit() {
        assert_eq!(prepare_outgoing("hi", Channel::Local, "$"), chat("#l hi"));
        assert_eq!(prepare_outgoing("hi", Channel::Global, "$"), chat("hi"));
        assert_eq!(prepare_outgoing("$t wool", Channel::Local, "$"), chat("$t wool"));
        assert_eq!(prepare_outgoing("#a psst", Channel::Trade, "$"), chat("#a psst"));
        assert_eq!(prepare_outgoing("! hi all", Channel::Clan, "$"), chat("! hi all"));
    }

    #[test]
    fn bang_lines_stay_global_on_the_server() {
        for raw in ["! #l secret", "!$t wts wool", "! hi"] {
            let Outgoing::Chat { text, .. } = prepare_outgoing(raw, Channel::Trade, "$") else {
                panic!("{raw:?} was not sent");
            };
            assert_eq!(text, raw);
            assert_eq!(parse_outgoing(&text, "$").channel, Channel::Global, "{raw:?}");
        }
        let parsed = parse_outgoing("! #l secret", "$");
        assert_eq!(parsed.body, "#l secret");
    }

    #[test]
    fn hex_colors_are_not_selectors() {
        assert_eq!(
            prepare_outgoing("#FF0000 red", Channel::Trade, "$"),
            chat("#t #FF0000 red")
        );
    }

    #[test]
    fn long_lines_are_clamped_on_char_boundaries() {
        let long = "ж".repeat(300);
        match prepare_outgoing(&long, Channel::Global, "$") {
            Outgoing::Chat { text, truncated } => {
                assert!(truncated);
                assert_eq!(text.chars().count(), MAX_CHAT_LENGTH);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
