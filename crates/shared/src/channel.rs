use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::{NamedColor, Rgb};

/// The fixed set of chat channels. Declaration order is the ordinal used on the
/// wire and the order legacy prefixes are tried in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    #[default]
    #[serde(alias = "global")]
    Global,
    #[serde(alias = "local")]
    Local,
    #[serde(alias = "trade")]
    Trade,
    #[serde(alias = "clan")]
    Clan,
    #[serde(alias = "admin")]
    Admin,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Global,
        Channel::Local,
        Channel::Trade,
        Channel::Clan,
        Channel::Admin,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Global => "GLOBAL",
            Channel::Local => "LOCAL",
            Channel::Trade => "TRADE",
            Channel::Clan => "CLAN",
            Channel::Admin => "ADMIN",
        }
    }

    pub fn short_tag(self) -> &'static str {
        match self {
            Channel::Global => "G",
            Channel::Local => "L",
            Channel::Trade => "T",
            Channel::Clan => "C",
            Channel::Admin => "A",
        }
    }

    pub fn badge_color(self) -> NamedColor {
        match self {
            Channel::Global => NamedColor::Gray,
            Channel::Local => NamedColor::Green,
            Channel::Trade => NamedColor::Gold,
            Channel::Clan => NamedColor::Aqua,
            Channel::Admin => NamedColor::Red,
        }
    }

    pub fn default_tab_color(self) -> Rgb {
        self.badge_color().rgb()
    }

    pub fn default_text_color(self) -> Rgb {
        NamedColor::White.rgb()
    }

    /// Selector prefixes, each ending in a single space, matched case-insensitively.
    pub fn legacy_prefixes(self) -> &'static [&'static str] {
        match self {
            Channel::Global => &["#g ", "#global ", "#г ", "#глоб "],
            Channel::Local => &["#l ", "#local ", "#лок ", "#локал "],
            Channel::Trade => &["#t ", "#trade ", "#тр ", "#торг "],
            Channel::Clan => &["#c ", "#clan ", "#party ", "#к ", "#клан "],
            Channel::Admin => &["#a ", "#admin ", "#адм ", "#админ "],
        }
    }

    /// Prefix a client prepends to route a message into this channel.
    pub fn primary_prefix(self) -> &'static str {
        self.legacy_prefixes()[0]
    }

    pub fn switch_letters(self) -> &'static [char] {
        match self {
            Channel::Global => &['g', 'г'],
            Channel::Local => &['l', 'л'],
            Channel::Trade => &['t', 'т'],
            Channel::Clan => &['c', 'к'],
            Channel::Admin => &['a', 'а'],
        }
    }

    pub fn from_switch_letter(letter: char) -> Option<Channel> {
        let lower = letter.to_lowercase().next()?;
        Self::ALL
            .into_iter()
            .find(|channel| channel.switch_letters().contains(&lower))
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Channel> {
        Self::ALL.get(ordinal as usize).copied()
    }

    pub fn from_short_tag(tag: &str) -> Option<Channel> {
        Self::ALL
            .into_iter()
            .find(|channel| channel.short_tag().eq_ignore_ascii_case(tag.trim()))
    }

    pub fn from_name(name: &str) -> Option<Channel> {
        Self::ALL
            .into_iter()
            .find(|channel| channel.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
