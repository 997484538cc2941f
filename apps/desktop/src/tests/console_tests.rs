use chrono::{DateTime, Utc};
use shared::{
    codec::{tag, Envelope, Marker},
    text::RichText,
};

use super::*;

fn entry(kind: EntryKind, message: Envelope) -> Entry {
    let at = DateTime::<Utc>::from_timestamp(1_772_366_400, 0).expect("timestamp");
    Entry::new(kind, message, at)
}

#[test]
fn plain_lines_are_sent_as_typed() {
    assert_eq!(
        parse_console_line("/mute Bob 5m\n").expect("parse"),
        ConsoleCommand::Send("/mute Bob 5m".into())
    );
    assert_eq!(
        parse_console_line("$t wts diamonds").expect("parse"),
        ConsoleCommand::Send("$t wts diamonds".into())
    );
}

#[test]
fn console_commands_take_letters_or_names() {
    assert_eq!(
        parse_console_line(":tab l").expect("parse"),
        ConsoleCommand::Tab(Channel::Local)
    );
    assert_eq!(
        parse_console_line(":merge TRADE").expect("parse"),
        ConsoleCommand::Merge(Channel::Trade)
    );
    assert_eq!(
        parse_console_line(":t к").expect("parse"),
        ConsoleCommand::Tab(Channel::Clan)
    );
    assert_eq!(parse_console_line(":q").expect("parse"), ConsoleCommand::Quit);
    assert_eq!(
        parse_console_line(":unread").expect("parse"),
        ConsoleCommand::Unread
    );
}

#[test]
fn bad_console_commands_are_rejected() {
    assert_eq!(
        parse_console_line(":tab x"),
        Err(ConsoleError::BadChannel("x".into()))
    );
    assert_eq!(
        parse_console_line(":warp home"),
        Err(ConsoleError::Unknown("warp home".into()))
    );
    assert!(matches!(
        parse_console_line(":tab"),
        Err(ConsoleError::Unknown(_))
    ));
}

#[test]
fn entries_print_with_their_origin() {
    let mut surface = TerminalSurface::new(Vec::new());
    surface.show(&entry(
        EntryKind::Channel(Channel::Local),
        tag(Marker::Channel(Channel::Local), RichText::literal("Alex: hi")),
    ));
    surface.show(&entry(
        EntryKind::Private,
        Envelope::plain(RichText::literal("Bob whispers: psst")),
    ));
    surface.clear().expect("clear");

    let printed = String::from_utf8(surface.into_inner()).expect("utf8");
    assert_eq!(
        printed,
        "12:00:00  L | Alex: hi\n12:00:00 PM | Bob whispers: psst\n-----\n"
    );
}
