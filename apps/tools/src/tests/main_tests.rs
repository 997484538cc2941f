use super::*;

async fn storage(dir: &tempfile::TempDir) -> Storage {
    let url = format!("sqlite://{}", dir.path().join("tools.db").display());
    Storage::new(&url).await.expect("storage")
}

fn at() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_772_366_400, 0).expect("timestamp")
}

#[tokio::test]
async fn mute_then_list_then_unmute() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = storage(&dir).await;
    let target = Uuid::new_v4();

    let muted = run(
        &storage,
        Command::Mute {
            player_id: target,
            name: Some("Bob".into()),
            duration: "2h".into(),
            reason: vec!["spam".into(), "links".into()],
        },
        at(),
    )
    .await
    .expect("mute");
    assert_eq!(muted, vec!["muted Bob (2h 0m) by console: spam links"]);

    let listed = run(&storage, Command::Mutes, at()).await.expect("list");
    assert_eq!(listed, vec!["Bob (2h 0m) by console: spam links"]);

    let unmuted = run(&storage, Command::Unmute { player_id: target }, at())
        .await
        .expect("unmute");
    assert_eq!(unmuted, vec![format!("unmuted {target}")]);
    let again = run(&storage, Command::Unmute { player_id: target }, at())
        .await
        .expect("unmute again");
    assert_eq!(again, vec![format!("{target} is not muted")]);

    let history = run(
        &storage,
        Command::History {
            player_id: target,
            limit: 10,
        },
        at(),
    )
    .await
    .expect("history");
    assert_eq!(history.len(), 2);
    assert!(history[0].contains("UNMUTE by console"));
    assert!(history[1].ends_with("MUTE by console for 2h 0m: spam links"));
}

#[tokio::test]
async fn expired_mutes_are_not_listed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = storage(&dir).await;
    run(
        &storage,
        Command::Mute {
            player_id: Uuid::new_v4(),
            name: None,
            duration: "10s".into(),
            reason: Vec::new(),
        },
        at(),
    )
    .await
    .expect("mute");

    let later = at() + chrono::Duration::minutes(1);
    assert!(run(&storage, Command::Mutes, later)
        .await
        .expect("list")
        .is_empty());
}

#[tokio::test]
async fn bad_durations_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = storage(&dir).await;
    let result = run(
        &storage,
        Command::Mute {
            player_id: Uuid::new_v4(),
            name: None,
            duration: "soon".into(),
            reason: Vec::new(),
        },
        at(),
    )
    .await;
    assert!(result.is_err());
}
