use chrono::Utc;
use shared::domain::{BlockPos, MuteRecord, PlayerId};
use storage::{ChatLogRecord, LogJob, LogWriter, Storage};

fn record(message: &str) -> ChatLogRecord {
    ChatLogRecord {
        at: Utc::now(),
        channel: "TRADE".into(),
        username: "Trader".into(),
        player_id: PlayerId::new_random(),
        message: message.into(),
        dimension: "minecraft:overworld".into(),
        block: BlockPos::default(),
    }
}

#[tokio::test]
async fn writer_persists_jobs_in_submission_order() {
    let temp = tempfile::tempdir().expect("tempdir");
    let database_url = format!(
        "sqlite://{}",
        temp.path().join("logs.db").to_string_lossy().replace('\\', "/")
    );

    let (writer, _worker) = LogWriter::spawn(database_url.clone());
    writer.submit(LogJob::Chat(record("wts diamonds")));
    writer.submit(LogJob::Chat(record("wtb emeralds")));

    let target = PlayerId::new_random();
    writer.submit(LogJob::UpsertMute(MuteRecord {
        target,
        target_name: Some("Spammer".into()),
        actor: None,
        actor_name: "console".into(),
        created_at: Utc::now(),
        expires_at: None,
        reason: None,
    }));
    writer.flush().await;

    let storage = Storage::new(&database_url).await.expect("db");
    let rows = storage
        .recent_chat_logs(10, Some("TRADE"))
        .await
        .expect("rows");
    assert_eq!(rows.len(), 2);
    let mutes = storage.load_mutes().await.expect("mutes");
    assert_eq!(mutes.len(), 1);
    assert_eq!(mutes[0].target, target);

    writer.submit(LogJob::DeleteMute(target));
    writer.flush().await;
    assert!(storage.load_mutes().await.expect("mutes").is_empty());
}

#[tokio::test]
async fn disabled_writer_discards_jobs() {
    let writer = LogWriter::disabled();
    assert!(!writer.is_enabled());
    writer.submit(LogJob::Chat(record("ignored")));
    writer.flush().await;
}

#[tokio::test]
async fn unreachable_database_drops_jobs_without_stopping_worker() {
    let temp = tempfile::tempdir().expect("tempdir");
    let blocker = temp.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").expect("blocker");
    let database_url = format!(
        "sqlite://{}",
        blocker.join("logs.db").to_string_lossy().replace('\\', "/")
    );

    let (writer, worker) = LogWriter::spawn(database_url);
    writer.submit(LogJob::Chat(record("lost")));
    writer.flush().await;
    assert!(!worker.is_finished());
}
