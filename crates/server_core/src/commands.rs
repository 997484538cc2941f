//! In-game chat commands. Each one answers with chat notices for the player
//! who ran it.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use shared::{color::NamedColor, domain::PlayerId, text::RichText};
use tracing::debug;
use uuid::Uuid;

use crate::{
    area_spy::{MAX_AREA_MINUTES, MAX_AREA_RADIUS},
    duration::{format_remaining, parse_duration, MuteDuration},
    format::coords_link,
    mutes::{muted_notice, MuteStatus},
    perms::nodes,
    router::ChatRouter,
    world::{OnlinePlayers, PlayerSnapshot},
};

pub const MUTES_PER_PAGE: usize = 10;

#[derive(Debug, Parser)]
#[command(multicall = true, disable_help_subcommand = true)]
pub enum ChatCommand {
    Multichat {
        #[command(subcommand)]
        action: MultichatAction,
    },
    Spy {
        #[command(subcommand)]
        action: SpyAction,
    },
    Areahistory {
        radius: Option<u32>,
        minutes: Option<u32>,
    },
    Mute {
        target: String,
        duration: Option<String>,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        reason: Vec<String>,
    },
    Unmute {
        target: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        reason: Vec<String>,
    },
    Muted {
        target: String,
    },
    Mutelist {
        page: Option<usize>,
    },
}

#[derive(Debug, Subcommand)]
pub enum MultichatAction {
    Spy { state: Option<Toggle> },
    Adminmirror { state: Option<Toggle> },
}

#[derive(Debug, Subcommand)]
pub enum SpyAction {
    /// `off`, or a radius followed by optional minutes.
    Area {
        setting: Option<String>,
        minutes: Option<u32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Debug, PartialEq)]
pub enum CommandOutcome {
    /// Not one of ours; the host handles it.
    NotHandled,
    Replies(Vec<RichText>),
}

pub struct CommandService {
    router: Arc<ChatRouter>,
}

impl CommandService {
    pub fn new(router: Arc<ChatRouter>) -> Self {
        Self { router }
    }

    pub fn is_known(name: &str) -> bool {
        ChatCommand::command()
            .find_subcommand(name.to_lowercase())
            .is_some()
    }

    pub fn execute(
        &self,
        executor: &PlayerSnapshot,
        line: &str,
        online: &OnlinePlayers,
    ) -> CommandOutcome {
        let line = line.trim().trim_start_matches('/');
        let mut words = line.split_whitespace();
        let Some(name) = words.next().map(str::to_lowercase) else {
            return CommandOutcome::NotHandled;
        };
        if !Self::is_known(&name) {
            return CommandOutcome::NotHandled;
        }

        let args = std::iter::once(name).chain(words.map(str::to_string));
        let command = match ChatCommand::try_parse_from(args) {
            Ok(command) => command,
            Err(error) => {
                debug!(%error, "chat command rejected");
                let usage = error.render().to_string();
                let first = usage.lines().next().unwrap_or("invalid command").to_string();
                return CommandOutcome::Replies(vec![error_line(first)]);
            }
        };

        let replies = match command {
            ChatCommand::Multichat { action } => match action {
                MultichatAction::Spy { state } => self.spy_toggle(executor, state),
                MultichatAction::Adminmirror { state } => self.mirror_toggle(executor, state),
            },
            ChatCommand::Spy {
                action: SpyAction::Area { setting, minutes },
            } => self.area_spy(executor, setting, minutes),
            ChatCommand::Areahistory { radius, minutes } => {
                self.area_history(executor, radius, minutes)
            }
            ChatCommand::Mute {
                target,
                duration,
                reason,
            } => self.mute(executor, &target, duration, reason, online),
            ChatCommand::Unmute { target, reason } => self.unmute(executor, &target, reason, online),
            ChatCommand::Muted { target } => self.muted(executor, &target, online),
            ChatCommand::Mutelist { page } => self.mute_list(executor, page),
        };
        CommandOutcome::Replies(replies)
    }

    fn spy_toggle(&self, executor: &PlayerSnapshot, state: Option<Toggle>) -> Vec<RichText> {
        let spy = self.router.spy();
        let result = match state {
            None => spy.toggle(executor),
            Some(toggle) => spy.set(executor, toggle == Toggle::On),
        };
        match result {
            Some(true) => vec![ok_line("Spy mode enabled.")],
            Some(false) => vec![ok_line("Spy mode disabled.")],
            None => vec![no_permission()],
        }
    }

    fn mirror_toggle(&self, executor: &PlayerSnapshot, state: Option<Toggle>) -> Vec<RichText> {
        let mirror = self.router.mirror();
        let result = match state {
            None => mirror.toggle(executor),
            Some(toggle) => mirror.set(executor, toggle == Toggle::On),
        };
        match result {
            Some(true) => vec![ok_line("Admin mirror enabled.")],
            Some(false) => vec![ok_line("Admin mirror disabled.")],
            None => vec![no_permission()],
        }
    }

    fn area_spy(
        &self,
        executor: &PlayerSnapshot,
        setting: Option<String>,
        minutes: Option<u32>,
    ) -> Vec<RichText> {
        if !self.router.permissions().has(executor, nodes::SPY) {
            return vec![no_permission()];
        }
        let now = self.router.now();
        let area = self.router.area_spy();

        let radius = match setting.as_deref().map(str::to_lowercase).as_deref() {
            Some("off") => {
                area.disable(executor.id);
                return vec![ok_line("Area spy disabled.")];
            }
            None => {
                if area.active_watch(executor, now).is_some() {
                    area.disable(executor.id);
                    return vec![ok_line("Area spy disabled.")];
                }
                self.router.settings().local_radius_blocks.min(MAX_AREA_RADIUS)
            }
            Some(raw) => match raw.parse::<u32>() {
                Ok(radius) if (1..=MAX_AREA_RADIUS).contains(&radius) => radius,
                _ => {
                    return vec![error_line(format!(
                        "Radius must be a number between 1 and {MAX_AREA_RADIUS}."
                    ))]
                }
            },
        };
        if let Some(minutes) = minutes {
            if !(1..=MAX_AREA_MINUTES).contains(&minutes) {
                return vec![error_line(format!(
                    "Minutes must be between 1 and {MAX_AREA_MINUTES}."
                ))];
            }
        }

        let Some(watch) = area.enable(executor, radius, minutes, now) else {
            return vec![no_permission()];
        };
        let until = match minutes {
            Some(minutes) => format!("for {minutes} min"),
            None => "until disabled".to_string(),
        };
        vec![ok_line(format!(
            "Area spy enabled: {}b around {} {until}.",
            watch.radius,
            watch.center.position.block()
        ))]
    }

    fn area_history(
        &self,
        executor: &PlayerSnapshot,
        radius: Option<u32>,
        minutes: Option<u32>,
    ) -> Vec<RichText> {
        if !self.router.permissions().has(executor, nodes::SPY) {
            return vec![no_permission()];
        }
        let settings = self.router.settings();
        let radius = radius
            .unwrap_or(settings.local_radius_blocks)
            .clamp(1, MAX_AREA_RADIUS);
        let minutes = minutes
            .unwrap_or(settings.history_default_minutes)
            .clamp(1, MAX_AREA_MINUTES);

        let records = self
            .router
            .history()
            .query(&executor.location, radius, minutes, self.router.now());
        if records.is_empty() {
            return vec![info_line(format!(
                "No messages within {radius}b in the last {minutes} min."
            ))];
        }

        let mut replies = vec![info_line(format!(
            "{} message(s) within {radius}b in the last {minutes} min:",
            records.len()
        ))];
        replies.extend(records.into_iter().map(|record| {
            record
                .formatted
                .append(RichText::literal(" "))
                .append(coords_link(&record.location))
        }));
        replies
    }

    fn mute(
        &self,
        executor: &PlayerSnapshot,
        target: &str,
        duration: Option<String>,
        reason: Vec<String>,
        online: &OnlinePlayers,
    ) -> Vec<RichText> {
        if !self.router.permissions().has(executor, nodes::MUTE) {
            return vec![no_permission()];
        }
        if !self.router.settings().mutes_enabled {
            return vec![error_line("Mutes are disabled on this server.")];
        }
        let Some((target_id, target_name)) = self.resolve_target(target, online) else {
            return vec![error_line(format!("Player not found: {target}"))];
        };
        let duration = match duration.as_deref().map(parse_duration) {
            None => MuteDuration::Permanent,
            Some(Ok(duration)) => duration,
            Some(Err(error)) => return vec![error_line(capitalize(&error.to_string()))],
        };

        let now = self.router.now();
        let record = self.router.mutes().mute(
            target_id,
            target_name.clone(),
            executor,
            duration,
            join_reason(reason),
            now,
        );
        if online.get(target_id).is_some() {
            self.router.notify(target_id, muted_notice(&record, now));
        }

        let mut reply = format!(
            "Muted {} ({}).",
            display_name(target_id, target_name.as_deref()),
            format_remaining(record.remaining(now))
        );
        if let Some(reason) = &record.reason {
            reply.push_str(&format!(" Reason: {reason}"));
        }
        vec![ok_line(reply)]
    }

    fn unmute(
        &self,
        executor: &PlayerSnapshot,
        target: &str,
        reason: Vec<String>,
        online: &OnlinePlayers,
    ) -> Vec<RichText> {
        if !self.router.permissions().has(executor, nodes::UNMUTE) {
            return vec![no_permission()];
        }
        let Some((target_id, target_name)) = self.resolve_target(target, online) else {
            return vec![error_line(format!("Player not found: {target}"))];
        };
        let name = display_name(target_id, target_name.as_deref());
        match self
            .router
            .mutes()
            .unmute(target_id, executor, join_reason(reason), self.router.now())
        {
            Some(_) => {
                if online.get(target_id).is_some() {
                    self.router.notify(
                        target_id,
                        RichText::literal("You have been unmuted.").with_color(NamedColor::Green),
                    );
                }
                vec![ok_line(format!("Unmuted {name}."))]
            }
            None => vec![info_line(format!("{name} is not muted."))],
        }
    }

    fn muted(&self, executor: &PlayerSnapshot, target: &str, online: &OnlinePlayers) -> Vec<RichText> {
        if !self.router.permissions().has(executor, nodes::MUTED) {
            return vec![no_permission()];
        }
        let Some((target_id, target_name)) = self.resolve_target(target, online) else {
            return vec![error_line(format!("Player not found: {target}"))];
        };
        let name = display_name(target_id, target_name.as_deref());
        let now = self.router.now();
        match self.router.mutes().status(target_id, now) {
            MuteStatus::Muted(record) => {
                let mut line = format!(
                    "{name} is muted ({}) by {}.",
                    format_remaining(record.remaining(now)),
                    record.actor_name
                );
                if let Some(reason) = &record.reason {
                    line.push_str(&format!(" Reason: {reason}"));
                }
                vec![info_line(line)]
            }
            MuteStatus::NotMuted | MuteStatus::Expired(_) => {
                vec![info_line(format!("{name} is not muted."))]
            }
        }
    }

    fn mute_list(&self, executor: &PlayerSnapshot, page: Option<usize>) -> Vec<RichText> {
        if !self.router.permissions().has(executor, nodes::MUTE_LIST) {
            return vec![no_permission()];
        }
        let now = self.router.now();
        let mutes = self.router.mutes().list(now);
        if mutes.is_empty() {
            return vec![info_line("No active mutes.")];
        }
        let pages = mutes.len().div_ceil(MUTES_PER_PAGE);
        let page = page.unwrap_or(1).clamp(1, pages);

        let mut replies = vec![info_line(format!(
            "Active mutes ({}), page {page}/{pages}:",
            mutes.len()
        ))];
        for record in mutes
            .iter()
            .skip((page - 1) * MUTES_PER_PAGE)
            .take(MUTES_PER_PAGE)
        {
            let mut line = format!(
                "{} - {} - by {}",
                display_name(record.target, record.target_name.as_deref()),
                format_remaining(record.remaining(now)),
                record.actor_name
            );
            if let Some(reason) = &record.reason {
                line.push_str(&format!(" - {reason}"));
            }
            replies.push(RichText::literal(line).with_color(NamedColor::Gray));
        }
        replies
    }

    /// Online name, then a muted player's remembered name, then a raw UUID.
    fn resolve_target(
        &self,
        target: &str,
        online: &OnlinePlayers,
    ) -> Option<(PlayerId, Option<String>)> {
        if let Some(player) = online.find_by_name(target) {
            return Some((player.id, Some(player.name.clone())));
        }
        if let Some(record) = self.router.mutes().find_by_name(target) {
            return Some((record.target, record.target_name));
        }
        let id = PlayerId(Uuid::parse_str(target).ok()?);
        let name = self.router.mutes().get(id).and_then(|record| record.target_name);
        Some((id, name))
    }
}

fn join_reason(words: Vec<String>) -> Option<String> {
    let reason = words.join(" ");
    let reason = reason.trim();
    (!reason.is_empty()).then(|| reason.to_string())
}

fn display_name(id: PlayerId, name: Option<&str>) -> String {
    name.map_or_else(|| id.to_string(), str::to_string)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn ok_line(text: impl Into<String>) -> RichText {
    RichText::literal(text).with_color(NamedColor::Green)
}

fn info_line(text: impl Into<String>) -> RichText {
    RichText::literal(text).with_color(NamedColor::Yellow)
}

fn error_line(text: impl Into<String>) -> RichText {
    RichText::literal(text).with_color(NamedColor::Red)
}

fn no_permission() -> RichText {
    error_line("You don't have permission to do that.")
}

#[cfg(test)]
#[path = "tests/command_tests.rs"]
mod tests;
