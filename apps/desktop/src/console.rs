//! Line-oriented terminal front end: local `:` commands and a stdout chat surface.

use std::io::Write;

use client_core::{ChatSurface, Entry, EntryKind, SurfaceError};
use shared::Channel;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Tab(Channel),
    Merge(Channel),
    Tabs,
    Unread,
    Help,
    Quit,
    Send(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("unknown console command :{0} (try :help)")]
    Unknown(String),
    #[error("expected a channel letter or name, got {0:?}")]
    BadChannel(String),
}

pub const HELP: &str = ":tab <g|l|t|c|a>  open a tab
:merge <channel>  add or remove a tab from the merged view
:tabs             list tabs
:unread           unread counts
:quit             leave";

/// Anything not starting with `:` is handed to the chat session verbatim.
pub fn parse_console_line(line: &str) -> Result<ConsoleCommand, ConsoleError> {
    let Some(rest) = line.trim_end().strip_prefix(':') else {
        return Ok(ConsoleCommand::Send(line.trim_end().to_string()));
    };
    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next();
    match (name.as_str(), arg) {
        ("tab" | "t", Some(arg)) => parse_channel(arg).map(ConsoleCommand::Tab),
        ("merge" | "m", Some(arg)) => parse_channel(arg).map(ConsoleCommand::Merge),
        ("tabs", None) => Ok(ConsoleCommand::Tabs),
        ("unread", None) => Ok(ConsoleCommand::Unread),
        ("help" | "h", None) => Ok(ConsoleCommand::Help),
        ("quit" | "q", None) => Ok(ConsoleCommand::Quit),
        _ => Err(ConsoleError::Unknown(rest.trim().to_string())),
    }
}

fn parse_channel(raw: &str) -> Result<Channel, ConsoleError> {
    let mut chars = raw.chars();
    let single = match (chars.next(), chars.next()) {
        (Some(letter), None) => Channel::from_switch_letter(letter),
        _ => None,
    };
    single
        .or_else(|| Channel::from_name(raw))
        .ok_or_else(|| ConsoleError::BadChannel(raw.to_string()))
}

/// Writes each shown entry as one timestamped line.
pub struct TerminalSurface<W: Write> {
    out: W,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn print(&mut self, text: &str) {
        if let Err(error) = writeln!(self.out, "{text}") {
            tracing::debug!(%error, "terminal write failed");
        }
    }
}

impl<W: Write> ChatSurface for TerminalSurface<W> {
    fn clear(&mut self) -> Result<(), SurfaceError> {
        writeln!(self.out, "-----").map_err(|error| SurfaceError::ClearFailed(error.to_string()))
    }

    fn show(&mut self, entry: &Entry) {
        let line = format_entry(entry);
        self.print(&line);
    }
}

pub fn format_entry(entry: &Entry) -> String {
    let origin = match entry.kind {
        EntryKind::Channel(channel) => channel.short_tag(),
        EntryKind::System => "*",
        EntryKind::Private => "PM",
    };
    format!(
        "{} {origin:>2} | {}",
        entry.received_at.format("%H:%M:%S"),
        entry.message.body.plain_text()
    )
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
