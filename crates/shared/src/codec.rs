//! Channel tagging for messages that travel as opaque rich text.
//!
//! Messages the router builds carry an explicit [`Marker`] on their [`Envelope`].
//! Text the router did not build may still carry a marker token in a hidden
//! `insertion` field somewhere in its tree; [`detect`] falls back to scanning for
//! that token so third-party broadcasts can be classified as well.

use serde::{Deserialize, Serialize};

use crate::{channel::Channel, text::RichText};

pub const MARKER_NAMESPACE: &str = "multichat:";

const CHANNEL_KEY: &str = "channel=";
const ADMIN_MIRROR_TOKEN: &str = "admin_mirror";
const SPY_TOKEN: &str = "spy";
const FORCE_PRIVATE_TOKEN: &str = "force_private";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "channel", rename_all = "snake_case")]
pub enum Marker {
    Channel(Channel),
    AdminMirror,
    Spy,
    ForcePrivate,
}

impl Marker {
    pub fn token(self) -> String {
        match self {
            Marker::Channel(channel) => {
                format!("{MARKER_NAMESPACE}{CHANNEL_KEY}{}", channel.short_tag())
            }
            Marker::AdminMirror => format!("{MARKER_NAMESPACE}{ADMIN_MIRROR_TOKEN}"),
            Marker::Spy => format!("{MARKER_NAMESPACE}{SPY_TOKEN}"),
            Marker::ForcePrivate => format!("{MARKER_NAMESPACE}{FORCE_PRIVATE_TOKEN}"),
        }
    }

    /// Parses a marker token. Anything outside the namespace, or a channel token
    /// naming an unknown tag, is not a marker.
    pub fn parse_token(token: &str) -> Option<Marker> {
        let body = token.trim().strip_prefix(MARKER_NAMESPACE)?;
        if let Some(tag) = body.strip_prefix(CHANNEL_KEY) {
            return Channel::from_short_tag(tag).map(Marker::Channel);
        }
        match body {
            ADMIN_MIRROR_TOKEN => Some(Marker::AdminMirror),
            SPY_TOKEN => Some(Marker::Spy),
            FORCE_PRIVATE_TOKEN => Some(Marker::ForcePrivate),
            _ => None,
        }
    }
}

/// A system message as it crosses the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    pub body: RichText,
}

impl Envelope {
    pub fn plain(body: RichText) -> Self {
        Self { marker: None, body }
    }
}

pub fn tag(marker: Marker, body: RichText) -> Envelope {
    Envelope {
        marker: Some(marker),
        body,
    }
}

/// The envelope marker, else the first marker token found in the body tree.
pub fn detect(envelope: &Envelope) -> Option<Marker> {
    envelope.marker.or_else(|| detect_in_text(&envelope.body))
}

pub fn detect_in_text(text: &RichText) -> Option<Marker> {
    text.nodes()
        .filter_map(|node| node.style.insertion.as_deref())
        .find_map(Marker::parse_token)
}

/// Channel a message belongs to judging only by its channel marker.
pub fn detect_channel(envelope: &Envelope) -> Option<Channel> {
    match detect(envelope) {
        Some(Marker::Channel(channel)) => Some(channel),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_namespaced() {
        assert_eq!(Marker::Channel(Channel::Local).token(), "multichat:channel=L");
        assert_eq!(Marker::Spy.token(), "multichat:spy");
        for marker in [
            Marker::Channel(Channel::Admin),
            Marker::AdminMirror,
            Marker::Spy,
            Marker::ForcePrivate,
        ] {
            assert_eq!(Marker::parse_token(&marker.token()), Some(marker));
        }
    }

    #[test]
    fn malformed_tokens_are_absent() {
        assert_eq!(Marker::parse_token("multichat:channel=Q"), None);
        assert_eq!(Marker::parse_token("multichat:unknown"), None);
        assert_eq!(Marker::parse_token("channel=L"), None);
        assert_eq!(Marker::parse_token("othermod:spy"), None);
    }

    #[test]
    fn detect_prefers_envelope_then_first_hidden_token() {
        let body = RichText::literal("[")
            .append(RichText::literal("x").with_insertion("not a marker"))
            .append(RichText::literal("T").with_insertion(Marker::Channel(Channel::Trade).token()))
            .append(RichText::literal("C").with_insertion(Marker::Channel(Channel::Clan).token()));

        let untagged = Envelope::plain(body.clone());
        assert_eq!(detect(&untagged), Some(Marker::Channel(Channel::Trade)));
        assert_eq!(detect_channel(&untagged), Some(Channel::Trade));

        let tagged = tag(Marker::Spy, body);
        assert_eq!(detect(&tagged), Some(Marker::Spy));
        assert_eq!(detect_channel(&tagged), None);

        assert_eq!(detect(&Envelope::plain(RichText::literal("hi"))), None);
    }

    #[test]
    fn envelope_wire_shape() {
        let envelope = tag(Marker::Channel(Channel::Local), RichText::literal("hi"));
        let json = serde_json::to_value(&envelope).expect("json");
        assert_eq!(
            json["marker"],
            serde_json::json!({ "kind": "channel", "channel": "LOCAL" })
        );
        let back: Envelope = serde_json::from_value(json).expect("decode");
        assert_eq!(back, envelope);

        let spy = serde_json::to_value(tag(Marker::Spy, RichText::empty())).expect("json");
        assert_eq!(spy["marker"], serde_json::json!({ "kind": "spy" }));
    }
}
