use std::cell::RefCell;

use shared::{error::ApiError, error::ErrorCode, protocol::UiConfigSync};

use super::*;
use crate::{merged::MergedTabs, replay::SurfaceError};

#[derive(Default)]
struct RecordingSink {
    frames: RefCell<Vec<ClientFrame>>,
    closed: bool,
}

impl FrameSink for RecordingSink {
    fn send(&self, frame: ClientFrame) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.frames.borrow_mut().push(frame);
        Ok(())
    }
}

#[derive(Default)]
struct Lines(Vec<String>);

impl ChatSurface for Lines {
    fn clear(&mut self) -> Result<(), SurfaceError> {
        self.0.clear();
        Ok(())
    }

    fn show(&mut self, entry: &Entry) {
        self.0.push(entry.message.body.plain_text());
    }
}

fn session() -> ChatSession<RecordingSink> {
    ChatSession::new(
        ClientChat::with_merged(MergedTabs::in_memory(), true),
        UiConfig::default(),
        RecordingSink::default(),
    )
}

fn message(marker: Marker, text: &str) -> ClientEvent {
    ClientEvent::Frame(ServerFrame::SystemMessage {
        message: tag(marker, RichText::literal(text)),
    })
}

fn allow_admin() -> ClientEvent {
    ClientEvent::Frame(ServerFrame::UiConfigSync(UiConfigSync {
        admin_tab_allowed: true,
        ..UiConfigSync::default()
    }))
}

#[test]
fn typed_text_goes_out_prefixed_for_the_current_tab() {
    let mut session = session();
    let mut surface = Lines::default();

    assert!(session.switch_to(Channel::Local, &mut surface));
    assert_eq!(
        session.submit("hello", &mut surface).expect("submit"),
        Submitted::Chat { truncated: false }
    );
    assert_eq!(
        session.submit("/spy area 50", &mut surface).expect("submit"),
        Submitted::Command
    );
    assert_eq!(session.submit("  ", &mut surface).expect("submit"), Submitted::Nothing);

    assert_eq!(
        *session.sink.frames.borrow(),
        vec![
            ClientFrame::ActiveChannel { ordinal: 1 },
            ClientFrame::Chat {
                text: "#l hello".into()
            },
            ClientFrame::Command {
                line: "spy area 50".into()
            },
        ]
    );
}

#[test]
fn truncation_is_announced_locally() {
    let mut session = session();
    let mut surface = Lines::default();
    let result = session
        .submit(&"a".repeat(400), &mut surface)
        .expect("submit");
    assert_eq!(result, Submitted::Chat { truncated: true });
    assert_eq!(surface.0, vec!["Message was cut to 256 characters."]);
}

#[test]
fn only_messages_for_the_open_tab_are_shown() {
    let mut session = session();
    let mut surface = Lines::default();

    session.handle_event(message(Marker::Channel(Channel::Global), "g"), &mut surface);
    session.handle_event(message(Marker::Channel(Channel::Trade), "t"), &mut surface);
    session.handle_event(message(Marker::ForcePrivate, "psst"), &mut surface);
    assert_eq!(surface.0, vec!["g", "psst"]);
    assert_eq!(session.chat().unread(Channel::Trade), 1);

    session.switch_to(Channel::Trade, &mut surface);
    assert_eq!(surface.0, vec!["t", "psst"]);
}

#[test]
fn admin_tab_needs_the_server_sync() {
    let mut session = session();
    let mut surface = Lines::default();

    assert!(!session.switch_to(Channel::Admin, &mut surface));
    session.handle_event(allow_admin(), &mut surface);
    assert!(session.switch_to(Channel::Admin, &mut surface));

    let revoke = ClientEvent::Frame(ServerFrame::UiConfigSync(UiConfigSync::default()));
    session.handle_event(revoke, &mut surface);
    assert_eq!(session.chat().current(), Channel::Global);
}

#[test]
fn protocol_errors_are_reported_once() {
    let mut session = session();
    let mut surface = Lines::default();

    session.handle_event(ClientEvent::Error("bad frame".into()), &mut surface);
    session.handle_event(ClientEvent::Error("bad frame".into()), &mut surface);
    let oversized = UiConfigSync {
        switch_key: "x".repeat(40),
        ..UiConfigSync::default()
    };
    session.handle_event(
        ClientEvent::Frame(ServerFrame::UiConfigSync(oversized)),
        &mut surface,
    );
    assert_eq!(surface.0, vec!["Protocol error: bad frame"]);
    assert_eq!(session.ui().switch_key(), "$");

    session.handle_event(
        ClientEvent::Frame(ServerFrame::Error(ApiError::new(
            ErrorCode::Protocol,
            "unknown frame",
        ))),
        &mut surface,
    );
    assert_eq!(surface.0.len(), 2);
}

#[test]
fn disconnect_ends_the_session() {
    let mut session = session();
    let mut surface = Lines::default();
    assert!(!session.handle_event(ClientEvent::Disconnected, &mut surface));
    assert_eq!(surface.0, vec!["Disconnected from server."]);

    session.sink.closed = true;
    assert!(matches!(
        session.submit("hi", &mut surface),
        Err(TransportError::Closed)
    ));
}
