//! Glue between the transport, the replay engine and the host chat widget.

use chrono::Utc;
use shared::{
    codec::{tag, Envelope, Marker},
    protocol::{ClientFrame, ServerFrame, MAX_CHAT_LENGTH},
    text::RichText,
    Channel, NamedColor,
};
use tracing::{debug, warn};

use crate::{
    engine::{Arrival, Entry},
    outgoing::{prepare_outgoing, Outgoing},
    replay::{ChatSurface, ClientChat},
    transport::{ClientEvent, FrameSink, TransportError},
    ui_config::UiConfig,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    Nothing,
    Command,
    Chat { truncated: bool },
}

pub struct ChatSession<S: FrameSink> {
    chat: ClientChat,
    ui: UiConfig,
    sink: S,
    reported_protocol_error: bool,
}

impl<S: FrameSink> ChatSession<S> {
    pub fn new(chat: ClientChat, ui: UiConfig, sink: S) -> Self {
        Self {
            chat,
            ui,
            sink,
            reported_protocol_error: false,
        }
    }

    pub fn chat(&self) -> &ClientChat {
        &self.chat
    }

    pub fn ui(&self) -> &UiConfig {
        &self.ui
    }

    /// Tells the server which tab is open; sent once after connecting and on
    /// every switch.
    pub fn report_active_channel(&self) -> Result<(), TransportError> {
        self.sink.send(ClientFrame::ActiveChannel {
            ordinal: self.chat.current().ordinal(),
        })
    }

    /// Returns false once the connection is gone.
    pub fn handle_event(&mut self, event: ClientEvent, surface: &mut dyn ChatSurface) -> bool {
        match event {
            ClientEvent::Frame(ServerFrame::SystemMessage { message }) => {
                self.deliver(message, surface);
            }
            ClientEvent::Frame(ServerFrame::UiConfigSync(sync)) => match sync.validate() {
                Ok(()) => {
                    self.ui.apply_sync(&sync);
                    if !self.ui.is_admin_tab_allowed() && self.chat.current() == Channel::Admin {
                        self.switch_to(Channel::Global, surface);
                    }
                }
                Err(error) => self.report_protocol_error(&error.to_string(), surface),
            },
            ClientEvent::Frame(ServerFrame::Error(error)) => {
                self.notice(&format!("Server error: {}", error.message), surface);
            }
            ClientEvent::Error(error) => self.report_protocol_error(&error, surface),
            ClientEvent::Disconnected => {
                self.notice("Disconnected from server.", surface);
                return false;
            }
        }
        true
    }

    pub fn submit(
        &mut self,
        raw: &str,
        surface: &mut dyn ChatSurface,
    ) -> Result<Submitted, TransportError> {
        match prepare_outgoing(raw, self.chat.current(), self.ui.switch_key()) {
            Outgoing::Empty => Ok(Submitted::Nothing),
            Outgoing::Command(line) => {
                self.sink.send(ClientFrame::Command { line })?;
                Ok(Submitted::Command)
            }
            Outgoing::Chat { text, truncated } => {
                self.sink.send(ClientFrame::Chat { text })?;
                if truncated {
                    self.notice(
                        &format!("Message was cut to {MAX_CHAT_LENGTH} characters."),
                        surface,
                    );
                }
                Ok(Submitted::Chat { truncated })
            }
        }
    }

    /// The admin tab cannot be opened until the server allows it.
    pub fn switch_to(&mut self, channel: Channel, surface: &mut dyn ChatSurface) -> bool {
        if channel == Channel::Admin && !self.ui.is_admin_tab_allowed() {
            return false;
        }
        if !self.chat.switch_to(channel, surface) {
            return false;
        }
        if let Err(error) = self.report_active_channel() {
            debug!(%error, "active channel not reported");
        }
        true
    }

    pub fn toggle_merged(&mut self, channel: Channel, surface: &mut dyn ChatSurface) {
        self.chat.toggle_merged(channel, surface);
    }

    fn deliver(&mut self, message: Envelope, surface: &mut dyn ChatSurface) {
        let now = Utc::now();
        let Some(arrival) = self.chat.handle_incoming(message.clone(), now) else {
            return;
        };
        if let Arrival::Shown(kind) = arrival {
            surface.show(&Entry::new(kind, message, now));
        }
    }

    fn report_protocol_error(&mut self, error: &str, surface: &mut dyn ChatSurface) {
        warn!(%error, "protocol error");
        if self.reported_protocol_error {
            return;
        }
        self.reported_protocol_error = true;
        self.notice(&format!("Protocol error: {error}"), surface);
    }

    fn notice(&mut self, text: &str, surface: &mut dyn ChatSurface) {
        let notice = RichText::literal(text).with_color(NamedColor::Red);
        self.deliver(tag(Marker::ForcePrivate, notice), surface);
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
