//! Chat routing: turns one line typed by a player into per-recipient
//! deliveries across the primary channel, mentions, the admin mirror, the spy
//! feed and area watches.

use std::{collections::HashSet, path::PathBuf, sync::Arc};

use chrono::{DateTime, Utc};
use shared::{
    channel::Channel,
    codec::{tag, Envelope, Marker},
    color::NamedColor,
    domain::{MuteRecord, PlayerId},
    heuristics::is_waypoint_share_command,
    parser::parse_outgoing,
    protocol::UiConfigSync,
    text::RichText,
};
use storage::{ChatLogRecord, DeathLogRecord};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    active::ActiveChannels,
    area_spy::AreaSpyState,
    collaborators::{
        ChatLogSink, Clock, CommandExecutor, DeliveryError, PartyProvider, PermissionProvider,
        PrefixProvider, Transport,
    },
    delivery::{fan_out, FanoutReport},
    format::{area_header, coords_link, spy_header, FormatVariant, MessageFormatter},
    history::{HistoryBuffer, HistoryRecord},
    mentions::resolve_mentions,
    mirror::AdminMirrorState,
    mutes::{auto_unmute_notice, muted_notice, MuteManager, MuteStatus},
    perms::{nodes, Permissions},
    recipients::{within_radius, RecipientResolver},
    relay::{RelayOutcome, SystemRelay},
    settings::ChatSettings,
    spy::SpyState,
    sync::ui_config,
    world::{OnlinePlayers, PlayerSnapshot},
};

/// Why a line was not delivered. The sender has already been told.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("sender is muted")]
    Muted(Box<MuteRecord>),
    #[error("sender may not write to {0}")]
    PermissionDenied(Channel),
    #[error("nobody can receive {0} messages right now")]
    NoRecipients(Channel),
}

#[derive(Debug)]
pub enum Dispatch {
    /// Blank line after prefix stripping; nothing happened.
    Silent,
    Routed(DispatchReport),
}

#[derive(Debug, Default)]
pub struct DispatchReport {
    pub channel: Channel,
    pub body: String,
    pub recipients: Vec<PlayerId>,
    pub mentioned: Vec<PlayerId>,
    pub mirrored: Vec<PlayerId>,
    pub spied: Vec<PlayerId>,
    pub area_spied: Vec<PlayerId>,
    /// CLAN lines are handed to the clan command instead of being delivered here.
    pub delegated: bool,
    pub delegate_error: Option<String>,
    pub failed: Vec<PlayerId>,
}

#[derive(Debug, Default)]
pub struct DeathReport {
    pub recipients: Vec<PlayerId>,
    pub mirrored: Vec<PlayerId>,
}

/// Everything the router needs from its host.
pub struct RouterDeps {
    pub settings: ChatSettings,
    pub permissions: Arc<dyn PermissionProvider>,
    pub prefixes: Arc<dyn PrefixProvider>,
    pub parties: Arc<dyn PartyProvider>,
    pub clan_delegate: Arc<dyn CommandExecutor>,
    pub transport: Arc<dyn Transport>,
    pub chat_log: Arc<dyn ChatLogSink>,
    pub clock: Arc<dyn Clock>,
    /// Where enabled spies are persisted; `None` keeps them in memory.
    pub spy_store: Option<PathBuf>,
}

pub struct ChatRouter {
    settings: ChatSettings,
    perms: Permissions,
    formatter: MessageFormatter,
    resolver: RecipientResolver,
    clan_delegate: Arc<dyn CommandExecutor>,
    transport: Arc<dyn Transport>,
    chat_log: Arc<dyn ChatLogSink>,
    clock: Arc<dyn Clock>,
    mutes: MuteManager,
    mirror: AdminMirrorState,
    spy: SpyState,
    area_spy: AreaSpyState,
    history: HistoryBuffer,
    active: Arc<ActiveChannels>,
    relay: SystemRelay,
}

impl ChatRouter {
    pub fn new(deps: RouterDeps) -> Self {
        let settings = deps.settings.validated();
        let perms = Permissions::new(deps.permissions, settings.permission_level);
        let active = Arc::new(ActiveChannels::new());
        let spy = match deps.spy_store {
            Some(path) => SpyState::load(perms.clone(), path),
            None => SpyState::in_memory(perms.clone()),
        };
        let relay = SystemRelay::new(
            deps.transport.clone(),
            deps.chat_log.clone(),
            active.clone(),
            deps.clock.clone(),
            settings.chat_log_enabled && settings.include_system_messages,
        );

        Self {
            formatter: MessageFormatter::new(settings.clone(), deps.prefixes),
            resolver: RecipientResolver::new(
                settings.local_radius_blocks,
                perms.clone(),
                deps.parties,
            ),
            clan_delegate: deps.clan_delegate,
            transport: deps.transport,
            mutes: MuteManager::new(deps.chat_log.clone()),
            chat_log: deps.chat_log,
            clock: deps.clock,
            mirror: AdminMirrorState::new(perms.clone()),
            spy,
            area_spy: AreaSpyState::new(perms.clone()),
            history: HistoryBuffer::new(settings.history_max_messages),
            active,
            relay,
            perms,
            settings,
        }
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn permissions(&self) -> &Permissions {
        &self.perms
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn mutes(&self) -> &MuteManager {
        &self.mutes
    }

    pub fn spy(&self) -> &SpyState {
        &self.spy
    }

    pub fn mirror(&self) -> &AdminMirrorState {
        &self.mirror
    }

    pub fn area_spy(&self) -> &AreaSpyState {
        &self.area_spy
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn handle_chat(
        &self,
        sender: &PlayerSnapshot,
        raw: &str,
        online: &OnlinePlayers,
    ) -> Result<Dispatch, RouteError> {
        let parsed = parse_outgoing(raw, &self.settings.switch_key);
        let channel = parsed.channel;
        let body = parsed.body;
        if body.trim().is_empty() {
            return Ok(Dispatch::Silent);
        }
        let now = self.clock.now();

        if self.settings.mutes_enabled {
            match self.mutes.status(sender.id, now) {
                MuteStatus::Muted(record) => {
                    self.notify(sender.id, muted_notice(&record, now));
                    return Err(RouteError::Muted(Box::new(record)));
                }
                MuteStatus::Expired(_) => self.notify(sender.id, auto_unmute_notice()),
                MuteStatus::NotMuted => {}
            }
        }

        if channel == Channel::Admin && !self.perms.has(sender, nodes::ADMIN_CHAT) {
            self.notify(
                sender.id,
                RichText::literal("You don't have permission to write to the admin channel.")
                    .with_color(NamedColor::Red),
            );
            return Err(RouteError::PermissionDenied(channel));
        }

        let mut report = DispatchReport {
            channel,
            body: body.clone(),
            ..DispatchReport::default()
        };

        if channel == Channel::Clan {
            report.delegated = true;
            let command = format!("{} {}", self.settings.clan_command, body);
            if let Err(error) = self.clan_delegate.execute_as(sender, &command) {
                warn!(%error, sender = %sender.name, "clan delegate failed");
                self.notify(
                    sender.id,
                    RichText::literal("Clan chat is unavailable right now.")
                        .with_color(NamedColor::Red),
                );
                report.delegate_error = Some(error.to_string());
            }
        }

        let formatted = self
            .formatter
            .format_chat(channel, sender, &body, now, FormatVariant::Normal);
        let targets = self.resolver.resolve(channel, sender, online);

        if channel != Channel::Clan {
            if targets.is_empty() {
                self.notify(
                    sender.id,
                    RichText::literal("Nobody can hear you on this channel.")
                        .with_color(NamedColor::Red),
                );
                return Err(RouteError::NoRecipients(channel));
            }

            let primary = fan_out(
                self.transport.as_ref(),
                targets.iter().map(|player| player.id),
                &tag(Marker::Channel(channel), formatted.clone()),
            );
            report.recipients = primary.delivered;
            report.failed = primary.failed;

            // Admin lines never leak to non-admins through a mention.
            if channel != Channel::Admin {
                let target_ids: HashSet<PlayerId> = targets.iter().map(|p| p.id).collect();
                let mentioned: Vec<PlayerId> = resolve_mentions(&body, online)
                    .into_iter()
                    .map(|player| player.id)
                    .filter(|id| !target_ids.contains(id))
                    .collect();
                let private = fan_out(
                    self.transport.as_ref(),
                    mentioned,
                    &tag(Marker::ForcePrivate, formatted.clone()),
                );
                report.mentioned = private.delivered;
                report.failed.extend(private.failed);
            }
        }

        if channel != Channel::Admin {
            let mirror = fan_out(
                self.transport.as_ref(),
                self.mirror.recipients(online).into_iter().map(|p| p.id),
                &tag(Marker::AdminMirror, formatted.clone()),
            );
            report.mirrored = mirror.delivered;
            report.failed.extend(mirror.failed);
        }

        let mut reached: HashSet<PlayerId> = targets.iter().map(|player| player.id).collect();
        reached.extend(report.mentioned.iter().copied());
        reached.insert(sender.id);

        let spy_copy = self
            .formatter
            .format_chat(channel, sender, &body, now, FormatVariant::Spy);
        let spied = fan_out(
            self.transport.as_ref(),
            self.spy
                .recipients(online)
                .into_iter()
                .map(|player| player.id)
                .filter(|id| !reached.contains(id)),
            &tag(Marker::Spy, spy_copy),
        );
        report.spied = spied.delivered;
        report.failed.extend(spied.failed);

        if channel == Channel::Local {
            self.history.record(HistoryRecord {
                at: now,
                channel,
                location: sender.location.clone(),
                formatted: formatted.clone(),
            });
            let area = self.deliver_area_watch(sender, &formatted, &reached, online, now);
            report.area_spied = area.delivered;
            report.failed.extend(area.failed);
        }

        if self.settings.chat_log_enabled {
            self.chat_log.log_chat(ChatLogRecord {
                at: now,
                channel: channel.name().to_string(),
                username: sender.name.clone(),
                player_id: sender.id,
                message: body.clone(),
                dimension: sender.location.dimension.to_string(),
                block: sender.location.position.block(),
            });
        }
        info!("[{}] {}: {}", channel.short_tag(), sender.name, body);

        Ok(Dispatch::Routed(report))
    }

    fn deliver_area_watch(
        &self,
        sender: &PlayerSnapshot,
        formatted: &RichText,
        reached: &HashSet<PlayerId>,
        online: &OnlinePlayers,
        now: DateTime<Utc>,
    ) -> FanoutReport {
        let mut report = FanoutReport::default();
        for (admin, watch) in self.area_spy.watchers(online, &sender.location, now) {
            if reached.contains(&admin.id) {
                continue;
            }
            let line = area_header(watch.radius, now)
                .append(formatted.clone())
                .append(RichText::literal(" "))
                .append(coords_link(&sender.location));
            report.absorb(fan_out(
                self.transport.as_ref(),
                [admin.id],
                &tag(Marker::Channel(Channel::Local), line),
            ));
        }
        report
    }

    /// Copies an executed command to the spy feed. Returns who received it.
    pub fn observe_command(
        &self,
        executor: &PlayerSnapshot,
        line: &str,
        online: &OnlinePlayers,
    ) -> Vec<PlayerId> {
        let command = line.trim().trim_start_matches('/').trim();
        if command.is_empty() {
            return Vec::new();
        }
        if is_waypoint_share_command(command) {
            self.relay.note_share_command(executor);
        }
        if is_spy_toggle(command) {
            return Vec::new();
        }

        let feed = spy_header(self.clock.now()).append(
            RichText::literal(format!("{} -> /{}", executor.name, command))
                .with_color(NamedColor::Gray),
        );
        fan_out(
            self.transport.as_ref(),
            self.spy
                .recipients(online)
                .into_iter()
                .map(|player| player.id)
                .filter(|id| *id != executor.id),
            &tag(Marker::Spy, feed),
        )
        .delivered
    }

    /// Delivers a death message to nearby players only. Returns `None` when
    /// local death messages are off and the host should broadcast as usual.
    pub fn route_death(
        &self,
        player: &PlayerSnapshot,
        death: &RichText,
        online: &OnlinePlayers,
    ) -> Option<DeathReport> {
        if !self.settings.death_messages_local_only {
            return None;
        }
        let now = self.clock.now();
        let line = self.formatter.death_line(Channel::Local, death, now);

        let nearby = within_radius(player, online, self.settings.death_radius_blocks);
        let local = fan_out(
            self.transport.as_ref(),
            nearby.iter().map(|p| p.id),
            &tag(Marker::Channel(Channel::Local), line.clone()),
        );
        let admins = fan_out(
            self.transport.as_ref(),
            online
                .iter()
                .filter(|p| self.perms.has(p, nodes::ADMIN_CHAT))
                .map(|p| p.id),
            &tag(Marker::AdminMirror, line.clone()),
        );

        self.history.record(HistoryRecord {
            at: now,
            channel: Channel::Local,
            location: player.location.clone(),
            formatted: line,
        });
        if self.settings.death_log_enabled {
            self.chat_log.log_death(DeathLogRecord {
                at: now,
                username: player.name.clone(),
                player_id: player.id,
                message: death.plain_text(),
                dimension: player.location.dimension.to_string(),
                block: player.location.position.block(),
            });
        }
        info!(player = %player.name, "{}", death.plain_text());

        Some(DeathReport {
            recipients: local.delivered,
            mirrored: admins.delivered,
        })
    }

    pub fn set_active_channel(&self, player: PlayerId, ordinal: u8) -> Channel {
        self.active.report(player, ordinal)
    }

    pub fn active_channel(&self, player: PlayerId) -> Channel {
        self.active.get(player)
    }

    pub fn ui_config_for(&self, player: &PlayerSnapshot) -> UiConfigSync {
        ui_config(&self.settings, self.perms.has(player, nodes::ADMIN_CHAT))
    }

    /// Sends a system message the router did not build itself.
    pub fn relay_system(
        &self,
        recipient: &PlayerSnapshot,
        message: Envelope,
        online: &OnlinePlayers,
    ) -> Result<RelayOutcome, DeliveryError> {
        self.relay.send(recipient, message, online)
    }

    pub fn disconnect(&self, player: PlayerId) {
        self.active.forget(player);
        self.relay.forget(player);
    }

    /// A private notice to one player, visible in every tab.
    pub fn notify(&self, player: PlayerId, text: RichText) {
        fan_out(
            self.transport.as_ref(),
            [player],
            &tag(Marker::ForcePrivate, text),
        );
    }
}

fn is_spy_toggle(command: &str) -> bool {
    let mut words = command.split_whitespace().map(str::to_lowercase);
    matches!(
        (words.next().as_deref(), words.next().as_deref()),
        (Some("multichat"), Some("spy"))
    )
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
