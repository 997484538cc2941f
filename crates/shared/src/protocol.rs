use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    channel::Channel,
    codec::Envelope,
    color::Rgb,
    domain::Location,
    error::{ApiError, ProtocolError},
    parser::DEFAULT_SWITCH_KEY,
};

/// Longest chat line the server accepts.
pub const MAX_CHAT_LENGTH: usize = 256;
pub const MAX_SWITCH_KEY_LENGTH: usize = 16;
pub const MAX_TAB_LABEL_LENGTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientFrame {
    Chat { text: String },
    /// A command line without its leading `/`.
    Command { line: String },
    ActiveChannel { ordinal: u8 },
    Move { location: Location },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerFrame {
    SystemMessage { message: Envelope },
    UiConfigSync(UiConfigSync),
    Error(ApiError),
}

/// Per-client display settings pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiConfigSync {
    pub switch_key: String,
    pub tab_labels: BTreeMap<Channel, String>,
    pub tab_colors: BTreeMap<Channel, Rgb>,
    pub admin_tab_allowed: bool,
}

impl Default for UiConfigSync {
    fn default() -> Self {
        Self {
            switch_key: DEFAULT_SWITCH_KEY.to_string(),
            tab_labels: Channel::ALL
                .into_iter()
                .map(|channel| (channel, channel.short_tag().to_string()))
                .collect(),
            tab_colors: Channel::ALL
                .into_iter()
                .map(|channel| (channel, channel.default_tab_color()))
                .collect(),
            admin_tab_allowed: false,
        }
    }
}

impl UiConfigSync {
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let key_len = self.switch_key.chars().count();
        if key_len > MAX_SWITCH_KEY_LENGTH {
            return Err(ProtocolError::InvalidSync(format!(
                "switch key is {key_len} chars, limit {MAX_SWITCH_KEY_LENGTH}"
            )));
        }
        for (channel, label) in &self.tab_labels {
            let len = label.chars().count();
            if len == 0 || len > MAX_TAB_LABEL_LENGTH {
                return Err(ProtocolError::InvalidSync(format!(
                    "label for {channel} must be 1..={MAX_TAB_LABEL_LENGTH} chars"
                )));
            }
        }
        Ok(())
    }
}

pub fn decode_client_frame(text: &str) -> Result<ClientFrame, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

pub fn decode_server_frame(text: &str) -> Result<ServerFrame, ProtocolError> {
    let frame: ServerFrame = serde_json::from_str(text)?;
    if let ServerFrame::UiConfigSync(sync) = &frame {
        sync.validate()?;
    }
    Ok(frame)
}

pub fn encode_frame<T: Serialize>(frame: &T) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codec::{tag, Marker},
        text::RichText,
    };

    #[test]
    fn client_frames_use_type_and_payload() {
        let frame = ClientFrame::ActiveChannel { ordinal: 2 };
        let json = serde_json::to_value(&frame).expect("json");
        assert_eq!(
            json,
            serde_json::json!({ "type": "active_channel", "payload": { "ordinal": 2 } })
        );
        let text = encode_frame(&ClientFrame::Chat { text: "#l hi".into() }).expect("encode");
        assert_eq!(
            decode_client_frame(&text).expect("decode"),
            ClientFrame::Chat { text: "#l hi".into() }
        );
    }

    #[test]
    fn server_frames_roundtrip_and_validate_sync() {
        let message = ServerFrame::SystemMessage {
            message: tag(Marker::Channel(Channel::Trade), RichText::literal("wts")),
        };
        let text = encode_frame(&message).expect("encode");
        assert_eq!(decode_server_frame(&text).expect("decode"), message);

        let mut sync = UiConfigSync::default();
        sync.tab_labels.insert(Channel::Trade, String::new());
        let text = encode_frame(&ServerFrame::UiConfigSync(sync)).expect("encode");
        assert!(matches!(
            decode_server_frame(&text),
            Err(ProtocolError::InvalidSync(_))
        ));
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(matches!(
            decode_client_frame("{\"type\":\"teleport\"}"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(decode_server_frame("not json").is_err());
    }

    #[test]
    fn default_sync_hides_admin_tab() {
        let sync = UiConfigSync::default();
        assert!(!sync.admin_tab_allowed);
        assert_eq!(sync.tab_labels[&Channel::Local], "L");
        assert_eq!(sync.tab_colors[&Channel::Clan], Rgb(0x55FFFF));
        sync.validate().expect("valid");
    }
}
