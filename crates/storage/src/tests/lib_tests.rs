use super::*;
use chrono::{Duration, TimeZone};

fn at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().expect("timestamp")
}

fn chat(ms: i64, channel: &str, message: &str) -> ChatLogRecord {
    ChatLogRecord {
        at: at(ms),
        channel: channel.to_string(),
        username: "Alex".to_string(),
        player_id: PlayerId(Uuid::from_u128(7)),
        message: message.to_string(),
        dimension: "minecraft:overworld".to_string(),
        block: BlockPos { x: 10, y: 64, z: -3 },
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db_path = temp.path().join("nested").join("chat.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    storage.close().await;

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn chat_logs_are_listed_newest_first_and_filtered_by_channel() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .insert_chat_log(&chat(1_000, "GLOBAL", "first"))
        .await
        .expect("insert");
    storage
        .insert_chat_log(&chat(2_000, "LOCAL", "second"))
        .await
        .expect("insert");
    storage
        .insert_chat_log(&chat(3_000, "GLOBAL", "third"))
        .await
        .expect("insert");

    let all = storage.recent_chat_logs(10, None).await.expect("query");
    let messages: Vec<_> = all.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(messages, vec!["third", "second", "first"]);
    assert_eq!(all[0], chat(3_000, "GLOBAL", "third"));

    let global = storage
        .recent_chat_logs(1, Some("GLOBAL"))
        .await
        .expect("query");
    assert_eq!(global.len(), 1);
    assert_eq!(global[0].message, "third");
}

#[tokio::test]
async fn death_logs_are_counted() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .insert_death_log(&DeathLogRecord {
            at: at(5_000),
            username: "Alex".into(),
            player_id: PlayerId(Uuid::from_u128(7)),
            message: "Alex fell from a high place".into(),
            dimension: "minecraft:overworld".into(),
            block: BlockPos { x: 0, y: 12, z: 0 },
        })
        .await
        .expect("insert");
    assert_eq!(storage.death_log_count().await.expect("count"), 1);
}

#[tokio::test]
async fn mutes_upsert_load_and_delete() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let target = PlayerId(Uuid::from_u128(42));
    let mut mute = MuteRecord {
        target,
        target_name: Some("Griefer".into()),
        actor: Some(PlayerId(Uuid::from_u128(1))),
        actor_name: "Mod".into(),
        created_at: at(10_000),
        expires_at: Some(at(10_000) + Duration::hours(1)),
        reason: Some("spam".into()),
    };
    storage.upsert_mute(&mute).await.expect("upsert");

    mute.expires_at = None;
    mute.reason = None;
    storage.upsert_mute(&mute).await.expect("overwrite");

    let loaded = storage.load_mutes().await.expect("load");
    assert_eq!(loaded, vec![mute]);

    assert!(storage.delete_mute(target).await.expect("delete"));
    assert!(!storage.delete_mute(target).await.expect("delete again"));
    assert!(storage.load_mutes().await.expect("load").is_empty());
}

#[tokio::test]
async fn moderation_history_keeps_actor_location() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let target = PlayerId(Uuid::from_u128(42));
    let mute = ModerationAction {
        at: at(20_000),
        kind: ModerationKind::Mute,
        actor: Some(PlayerId(Uuid::from_u128(1))),
        actor_name: "Mod".into(),
        target,
        target_name: Some("Griefer".into()),
        duration_ms: Some(600_000),
        expires_at: Some(at(620_000)),
        reason: Some("spam".into()),
        actor_location: Some(("minecraft:overworld".into(), BlockPos { x: 1, y: 2, z: 3 })),
    };
    let auto = ModerationAction {
        at: at(620_000),
        kind: ModerationKind::AutoUnmute,
        actor: None,
        actor_name: "SYSTEM".into(),
        target,
        target_name: Some("Griefer".into()),
        duration_ms: None,
        expires_at: None,
        reason: None,
        actor_location: None,
    };
    storage.insert_moderation_action(&mute).await.expect("mute");
    storage.insert_moderation_action(&auto).await.expect("auto");

    let history = storage.moderation_history(target, 10).await.expect("history");
    assert_eq!(history, vec![auto, mute]);
}
