use std::fs;

use shared::channel::Channel;

use super::*;

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(
        normalize_database_url("   "),
        Settings::default().database_url
    );
}

#[test]
fn creates_parent_dir_for_sqlite_url() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("data").join("test.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(temp_root.path().join("data").exists());
}

#[test]
fn missing_file_yields_defaults() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let missing = temp_root.path().join("absent.toml");
    let settings = load_settings_from(missing.to_string_lossy().as_ref()).expect("settings");
    assert_eq!(settings.bind_addr, Settings::default().bind_addr);
    assert_eq!(settings.chat, ChatSettings::default());
}

#[test]
fn file_values_are_read_and_range_checked() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let path = temp_root.path().join("multichat.toml");
    fs::write(
        &path,
        r##"
bind_addr = "0.0.0.0:9000"
admins = ["6f1c3b2e-0d5a-4a58-9d0e-2f6b8f7f4a11"]

[chat]
switch_key = "%"
local_radius_blocks = 5000
history_max_messages = 500

[chat.tab_labels]
TRADE = "$"

[chat.tab_colors]
local = "#00ff00"
"##,
    )
    .expect("write config");

    let settings = load_settings_from(path.to_string_lossy().as_ref()).expect("settings");
    assert_eq!(settings.bind_addr, "0.0.0.0:9000");
    assert_eq!(settings.admins.len(), 1);
    assert_eq!(settings.chat.switch_key, "%");
    assert_eq!(settings.chat.local_radius_blocks, 100);
    assert_eq!(settings.chat.history_max_messages, 500);
    assert_eq!(settings.chat.tab_label(Channel::Trade), "$");
    assert_eq!(settings.chat.tab_color(Channel::Local).to_hex(), "#00FF00");
}
