use std::sync::Arc;

use shared::{
    codec::{tag, Marker},
    text::RichText,
};

use super::*;
use crate::classify::EntryKind;

#[derive(Default)]
struct RecordingSurface {
    lines: Vec<String>,
    clears: usize,
    clear_fails: bool,
}

impl ChatSurface for RecordingSurface {
    fn clear(&mut self) -> Result<(), SurfaceError> {
        if self.clear_fails {
            return Err(SurfaceError::ClearFailed("read-only widget".into()));
        }
        self.clears += 1;
        self.lines.clear();
        Ok(())
    }

    fn show(&mut self, entry: &Entry) {
        self.lines.push(entry.message.body.plain_text());
    }
}

/// A host widget whose append path runs through the client's message hook.
struct HookedSurface {
    chat: Arc<ClientChat>,
    lines: Vec<String>,
    hook_results: Vec<Option<Arrival>>,
}

impl ChatSurface for HookedSurface {
    fn clear(&mut self) -> Result<(), SurfaceError> {
        self.lines.clear();
        Ok(())
    }

    fn show(&mut self, entry: &Entry) {
        let result = self.chat.handle_incoming(entry.message.clone(), now());
        self.hook_results.push(result);
        self.lines.push(entry.message.body.plain_text());
    }
}

fn now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_772_366_400, 0).expect("timestamp")
}

fn on(channel: Channel, text: &str) -> Envelope {
    tag(Marker::Channel(channel), RichText::literal(text))
}

fn chat() -> ClientChat {
    ClientChat::with_merged(MergedTabs::in_memory(), true)
}

#[test]
fn switching_tabs_replays_the_filtered_history() {
    let chat = chat();
    let mut surface = RecordingSurface::default();
    chat.handle_incoming(on(Channel::Global, "g1"), now());
    chat.handle_incoming(on(Channel::Local, "l1"), now());
    chat.handle_incoming(Envelope::plain(RichText::literal("sys")), now());
    chat.handle_incoming(on(Channel::Local, "l2"), now());

    assert!(chat.switch_to(Channel::Local, &mut surface));
    assert_eq!(surface.lines, vec!["l1", "sys", "l2"]);
    assert_eq!(surface.clears, 1);
    assert_eq!(chat.unread(Channel::Local), 0);

    assert!(!chat.switch_to(Channel::Local, &mut surface));
    assert_eq!(surface.clears, 1);
}

#[test]
fn rebuild_is_idempotent() {
    let chat = chat();
    let mut surface = RecordingSurface::default();
    chat.handle_incoming(on(Channel::Global, "a"), now());
    chat.handle_incoming(on(Channel::Trade, "b"), now());

    chat.rebuild(&mut surface);
    let first = surface.lines.clone();
    chat.rebuild(&mut surface);
    assert_eq!(surface.lines, first);
    assert_eq!(first, vec!["a"]);
}

#[test]
fn replayed_lines_are_not_stored_again() {
    let chat = Arc::new(chat());
    chat.handle_incoming(on(Channel::Global, "a"), now());
    chat.handle_incoming(on(Channel::Global, "b"), now());

    let mut surface = HookedSurface {
        chat: chat.clone(),
        lines: Vec::new(),
        hook_results: Vec::new(),
    };
    assert_eq!(chat.rebuild(&mut surface), 2);
    assert_eq!(surface.hook_results, vec![None, None]);
    assert!(!chat.is_rebuilding());

    chat.rebuild(&mut surface);
    assert_eq!(surface.lines, vec!["a", "b"]);
    assert_eq!(
        chat.handle_incoming(on(Channel::Global, "c"), now()),
        Some(Arrival::Shown(EntryKind::Channel(Channel::Global)))
    );
}

#[test]
fn a_surface_that_cannot_clear_still_gets_the_replay() {
    let chat = chat();
    let mut surface = RecordingSurface {
        lines: vec!["stale".into()],
        clear_fails: true,
        ..RecordingSurface::default()
    };
    chat.handle_incoming(on(Channel::Global, "fresh"), now());

    assert_eq!(chat.rebuild(&mut surface), 1);
    assert_eq!(surface.lines, vec!["stale", "fresh"]);
    assert!(!chat.is_rebuilding());
}

#[test]
fn merge_toggles_rebuild_the_view() {
    let chat = chat();
    let mut surface = RecordingSurface::default();
    chat.handle_incoming(on(Channel::Global, "g"), now());
    chat.handle_incoming(on(Channel::Trade, "t"), now());
    assert_eq!(chat.unread(Channel::Trade), 1);

    chat.toggle_merged(Channel::Global, &mut surface);
    chat.toggle_merged(Channel::Trade, &mut surface);

    assert_eq!(surface.lines, vec!["g", "t"]);
    assert_eq!(chat.unread(Channel::Trade), 0);
    assert_eq!(chat.merged_channels(), vec![Channel::Global, Channel::Trade]);
    assert_eq!(chat.visible().len(), 2);
}
