use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use shared::{
    channel::Channel,
    codec::Marker,
    color::NamedColor,
    domain::Location,
    inline::parse_inline,
    text::{ClickEvent, RichText},
};

use crate::{collaborators::PrefixProvider, settings::ChatSettings, world::PlayerSnapshot};

/// Which rendering of a chat line to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVariant {
    /// What recipients of the channel see.
    Normal,
    /// Desaturated copy for the moderator spy feed.
    Spy,
}

pub struct MessageFormatter {
    settings: ChatSettings,
    prefixes: Arc<dyn PrefixProvider>,
}

impl MessageFormatter {
    pub fn new(settings: ChatSettings, prefixes: Arc<dyn PrefixProvider>) -> Self {
        Self { settings, prefixes }
    }

    /// `[L]` in the channel color, carrying the channel marker as hidden text.
    pub fn badge(&self, channel: Channel) -> RichText {
        RichText::literal(format!("[{}]", self.settings.tab_label(channel)))
            .with_color(self.settings.tab_color(channel))
            .with_insertion(Marker::Channel(channel).token())
    }

    /// `[HH:mm] [L] <prefix> Name: body`
    pub fn format_chat(
        &self,
        channel: Channel,
        sender: &PlayerSnapshot,
        body: &str,
        at: DateTime<Utc>,
        variant: FormatVariant,
    ) -> RichText {
        let spy = variant == FormatVariant::Spy;
        let gray = NamedColor::Gray;

        let mut line = RichText::empty();
        line.push(
            RichText::literal(format!("[{}] ", clock_time(at, false)))
                .with_color(if spy { gray } else { NamedColor::DarkGray }),
        );

        let badge = self.badge(channel);
        line.push(if spy { badge.recolored(gray) } else { badge });
        line.push(RichText::literal(" "));

        if spy {
            line.push(RichText::literal("[").with_color(gray));
            line.push(RichText::literal("SPY").with_color(NamedColor::DarkRed));
            line.push(RichText::literal("] ").with_color(gray));
        }

        if let Some(prefix) = self.prefixes.prefix(sender.id).present() {
            if !prefix.is_blank() {
                line.push(if spy { prefix.recolored(gray) } else { prefix });
                line.push(RichText::literal(" "));
            }
        }

        let mut name = RichText::literal(sender.name.clone());
        if spy {
            name = name.with_color(gray);
        } else if let Some(color) = self.prefixes.name_color(sender.id).present() {
            name = name.with_color(color);
        }
        line.push(name);
        line.push(RichText::literal(": ").with_color(gray));

        let parsed = parse_inline(body);
        line.push(if spy {
            parsed.recolored(gray)
        } else if parsed.style.color.is_none() {
            parsed.with_color(self.settings.text_color(channel))
        } else {
            parsed
        });
        line
    }

    /// `[HH:mm:ss] [L] <death message>` as shown to nearby players.
    pub fn death_line(&self, channel: Channel, death: &RichText, at: DateTime<Utc>) -> RichText {
        RichText::empty()
            .append(
                RichText::literal(format!("[{}] ", clock_time(at, true)))
                    .with_color(NamedColor::DarkGray),
            )
            .append(self.badge(channel))
            .append(RichText::literal(" "))
            .append(death.clone())
    }
}

/// `[HH:mm:ss] [SPY] `
pub fn spy_header(at: DateTime<Utc>) -> RichText {
    RichText::empty()
        .append(RichText::literal(format!("[{}] ", clock_time(at, true))).with_color(NamedColor::Gray))
        .append(RichText::literal("[").with_color(NamedColor::Gray))
        .append(RichText::literal("SPY").with_color(NamedColor::DarkRed))
        .append(RichText::literal("] ").with_color(NamedColor::Gray))
}

/// `[HH:mm:ss] [AREA] (Nb) `
pub fn area_header(radius: u32, at: DateTime<Utc>) -> RichText {
    RichText::empty()
        .append(RichText::literal(format!("[{}] ", clock_time(at, true))).with_color(NamedColor::Gray))
        .append(RichText::literal("[").with_color(NamedColor::Gray))
        .append(RichText::literal("AREA").with_color(NamedColor::DarkAqua))
        .append(RichText::literal("] ").with_color(NamedColor::Gray))
        .append(RichText::literal(format!("({radius}b) ")).with_color(NamedColor::DarkGray))
}

/// Clickable `[x y z]` that teleports the viewer to the block.
pub fn coords_link(location: &Location) -> RichText {
    let block = location.position.block();
    RichText::literal(format!("[{block}]"))
        .with_color(NamedColor::Aqua)
        .with_click(ClickEvent::run_command(format!(
            "/execute in {} run tp @s {block}",
            location.dimension
        )))
        .with_hover(RichText::literal(format!("{} {block}", location.dimension)))
}

pub fn clock_time(at: DateTime<Utc>, with_seconds: bool) -> String {
    let local = at.with_timezone(&Local);
    if with_seconds {
        local.format("%H:%M:%S").to_string()
    } else {
        local.format("%H:%M").to_string()
    }
}
