use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use server_core::duration::{format_remaining, parse_duration, MuteDuration};
use shared::domain::{MuteRecord, PlayerId};
use storage::{ModerationAction, ModerationKind, Storage};
use uuid::Uuid;

/// Operator access to the chat database. A running server only picks up
/// mute edits made here on its next start.
#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/multichat.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Active mutes, newest first.
    Mutes,
    Mute {
        player_id: Uuid,
        #[arg(long)]
        name: Option<String>,
        /// e.g. 30m, 2h, 7d or perm
        #[arg(default_value = "perm")]
        duration: String,
        reason: Vec<String>,
    },
    Unmute {
        player_id: Uuid,
    },
    /// Recent chat log lines, newest first.
    Logs {
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long)]
        channel: Option<String>,
    },
    /// Moderation actions against one player.
    History {
        player_id: Uuid,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
}

const OPERATOR: &str = "console";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn").init();
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    for line in run(&storage, cli.command, Utc::now()).await? {
        println!("{line}");
    }
    storage.close().await;
    Ok(())
}

async fn run(storage: &Storage, command: Command, now: DateTime<Utc>) -> Result<Vec<String>> {
    let lines = match command {
        Command::Mutes => storage
            .load_mutes()
            .await?
            .iter()
            .filter(|mute| !mute.is_expired(now))
            .map(|mute| describe_mute(mute, now))
            .collect(),
        Command::Mute {
            player_id,
            name,
            duration,
            reason,
        } => {
            let duration = parse_duration(&duration)?;
            let target = PlayerId(player_id);
            let reason = Some(reason.join(" ")).filter(|reason| !reason.is_empty());
            let expires_at = match duration {
                MuteDuration::Permanent => None,
                MuteDuration::For(span) => Some(now + span),
            };
            let mute = MuteRecord {
                target,
                target_name: name.clone(),
                actor: None,
                actor_name: OPERATOR.into(),
                created_at: now,
                expires_at,
                reason: reason.clone(),
            };
            storage.upsert_mute(&mute).await?;
            storage
                .insert_moderation_action(&ModerationAction {
                    at: now,
                    kind: ModerationKind::Mute,
                    actor: None,
                    actor_name: OPERATOR.into(),
                    target,
                    target_name: name,
                    duration_ms: duration.as_millis(),
                    expires_at,
                    reason,
                    actor_location: None,
                })
                .await?;
            vec![format!("muted {}", describe_mute(&mute, now))]
        }
        Command::Unmute { player_id } => {
            let target = PlayerId(player_id);
            if !storage.delete_mute(target).await? {
                vec![format!("{target} is not muted")]
            } else {
                storage
                    .insert_moderation_action(&ModerationAction {
                        at: now,
                        kind: ModerationKind::Unmute,
                        actor: None,
                        actor_name: OPERATOR.into(),
                        target,
                        target_name: None,
                        duration_ms: None,
                        expires_at: None,
                        reason: None,
                        actor_location: None,
                    })
                    .await?;
                vec![format!("unmuted {target}")]
            }
        }
        Command::Logs { limit, channel } => storage
            .recent_chat_logs(limit, channel.as_deref())
            .await?
            .iter()
            .map(|record| {
                format!(
                    "{} [{}] {}: {} ({} {})",
                    record.at.format("%Y-%m-%d %H:%M:%S"),
                    record.channel,
                    record.username,
                    record.message,
                    record.dimension,
                    record.block
                )
            })
            .collect(),
        Command::History { player_id, limit } => storage
            .moderation_history(PlayerId(player_id), limit)
            .await?
            .iter()
            .map(|action| {
                let mut line = format!(
                    "{} {} by {}",
                    action.at.format("%Y-%m-%d %H:%M:%S"),
                    action.kind.as_str(),
                    action.actor_name
                );
                if let Some(ms) = action.duration_ms {
                    line.push_str(&format!(
                        " for {}",
                        format_remaining(Some(chrono::Duration::milliseconds(ms)))
                    ));
                }
                if let Some(reason) = &action.reason {
                    line.push_str(&format!(": {reason}"));
                }
                line
            })
            .collect(),
    };
    Ok(lines)
}

fn describe_mute(mute: &MuteRecord, now: DateTime<Utc>) -> String {
    let who = mute
        .target_name
        .clone()
        .unwrap_or_else(|| mute.target.to_string());
    let mut line = format!(
        "{who} ({}) by {}",
        format_remaining(mute.remaining(now)),
        mute.actor_name
    );
    if let Some(reason) = &mute.reason {
        line.push_str(&format!(": {reason}"));
    }
    line
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
