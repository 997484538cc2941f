//! Classification of text that carries no channel marker.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::{channel::Channel, text::RichText};

const WAYPOINT_COMMAND_HINTS: &[&str] = &["xaero", "waypoint"];
const WAYPOINT_TEXT_HINTS: &[&str] = &["waypoint", "xaero", "метк", "точк", "коорд"];
const PARTY_HINTS: &[&str] = &[
    "[party]", "[p]", "party>", " party]", "[клан]", "[пати]", "[группа]",
];
const PRIVATE_TEXT_HINTS: &[&str] = &["[pm]", "[dm]", "[whisper]", "[шепот]"];
const PRIVATE_TRANSLATION_PREFIXES: &[&str] =
    &["commands.message.display.", "commands.msg.display."];

/// Waypoint shares from map mods: a click command mentioning the mod, or a
/// waypoint-ish phrase combined with any clickable part.
pub fn is_waypoint_share(message: &RichText) -> bool {
    let command = message.first_command_click().map(str::to_lowercase);
    if command
        .as_deref()
        .is_some_and(|cmd| WAYPOINT_COMMAND_HINTS.iter().any(|hint| cmd.contains(hint)))
    {
        return true;
    }
    let text = message.plain_text().to_lowercase();
    WAYPOINT_TEXT_HINTS.iter().any(|hint| text.contains(hint)) && message.has_any_click()
}

/// Commands that make a map mod broadcast a waypoint share.
pub fn is_waypoint_share_command(command: &str) -> bool {
    let lower = command.to_lowercase();
    WAYPOINT_COMMAND_HINTS.iter().any(|hint| lower.contains(hint)) && lower.contains("share")
}

/// Key that identifies the same share arriving twice.
pub fn share_dedupe_key(message: &RichText) -> String {
    format!(
        "{}|{}",
        message.plain_text(),
        message.first_command_click().unwrap_or_default()
    )
}

pub fn looks_like_party_chat(plain: &str) -> bool {
    let lower = plain.to_lowercase();
    PARTY_HINTS.iter().any(|hint| lower.contains(hint))
}

pub fn is_private_message(message: &RichText) -> bool {
    let by_key = message.nodes().filter_map(RichText::translation_key).any(|key| {
        PRIVATE_TRANSLATION_PREFIXES
            .iter()
            .any(|prefix| key.starts_with(prefix))
    });
    if by_key {
        return true;
    }
    let lower = message.plain_text().to_lowercase();
    PRIVATE_TEXT_HINTS.iter().any(|hint| lower.contains(hint))
}

/// Finds a rendered badge such as `[12:00] [T] ...` in flattened text.
pub fn channel_from_rendered_text(plain: &str) -> Option<Channel> {
    Channel::ALL
        .into_iter()
        .find(|channel| plain.contains(&format!("] [{}]", channel.short_tag())))
}

/// Bounded memory of recently seen keys inside a time window.
#[derive(Debug, Clone)]
pub struct RecentKeys {
    window: Duration,
    capacity: usize,
    seen: VecDeque<(String, DateTime<Utc>)>,
}

impl RecentKeys {
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            window,
            capacity: capacity.max(1),
            seen: VecDeque::new(),
        }
    }

    /// Records `key` and reports whether it was already seen inside the window.
    pub fn check_and_mark(&mut self, key: &str, now: DateTime<Utc>) -> bool {
        let window = self.window;
        self.seen.retain(|(_, at)| now - *at < window);

        let duplicate = self.seen.iter().any(|(seen, _)| seen == key);
        if !duplicate {
            self.seen.push_back((key.to_string(), now));
            while self.seen.len() > self.capacity {
                self.seen.pop_front();
            }
        }
        duplicate
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
