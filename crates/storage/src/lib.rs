use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use uuid::Uuid;

use shared::domain::{BlockPos, MuteRecord, PlayerId};

mod writer;

pub use writer::{LogJob, LogWriter};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// One chat line as persisted. `channel` is a channel name or `SYSTEM`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatLogRecord {
    pub at: DateTime<Utc>,
    pub channel: String,
    pub username: String,
    pub player_id: PlayerId,
    pub message: String,
    pub dimension: String,
    pub block: BlockPos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeathLogRecord {
    pub at: DateTime<Utc>,
    pub username: String,
    pub player_id: PlayerId,
    pub message: String,
    pub dimension: String,
    pub block: BlockPos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationKind {
    Mute,
    Unmute,
    AutoUnmute,
}

impl ModerationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModerationKind::Mute => "MUTE",
            ModerationKind::Unmute => "UNMUTE",
            ModerationKind::AutoUnmute => "AUTO_UNMUTE",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "MUTE" => Some(ModerationKind::Mute),
            "UNMUTE" => Some(ModerationKind::Unmute),
            "AUTO_UNMUTE" => Some(ModerationKind::AutoUnmute),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModerationAction {
    pub at: DateTime<Utc>,
    pub kind: ModerationKind,
    pub actor: Option<PlayerId>,
    pub actor_name: String,
    pub target: PlayerId,
    pub target_name: Option<String>,
    pub duration_ms: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub actor_location: Option<(String, BlockPos)>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn insert_chat_log(&self, record: &ChatLogRecord) -> Result<i64> {
        let rec = sqlx::query(
            "INSERT INTO chat_logs
                (ts_epoch_ms, ts_iso, channel, username, player_id, message, dimension, x, y, z)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(record.at.timestamp_millis())
        .bind(record.at)
        .bind(&record.channel)
        .bind(&record.username)
        .bind(record.player_id.to_string())
        .bind(&record.message)
        .bind(&record.dimension)
        .bind(record.block.x)
        .bind(record.block.y)
        .bind(record.block.z)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert chat log row")?;
        Ok(rec.get::<i64, _>(0))
    }

    pub async fn insert_death_log(&self, record: &DeathLogRecord) -> Result<i64> {
        let rec = sqlx::query(
            "INSERT INTO death_logs
                (ts_epoch_ms, ts_iso, username, player_id, message, dimension, x, y, z)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(record.at.timestamp_millis())
        .bind(record.at)
        .bind(&record.username)
        .bind(record.player_id.to_string())
        .bind(&record.message)
        .bind(&record.dimension)
        .bind(record.block.x)
        .bind(record.block.y)
        .bind(record.block.z)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert death log row")?;
        Ok(rec.get::<i64, _>(0))
    }

    /// Newest first, optionally restricted to one channel name.
    pub async fn recent_chat_logs(
        &self,
        limit: u32,
        channel: Option<&str>,
    ) -> Result<Vec<ChatLogRecord>> {
        let rows = sqlx::query(
            "SELECT ts_iso, channel, username, player_id, message, dimension, x, y, z
             FROM chat_logs
             WHERE ?1 IS NULL OR channel = ?1
             ORDER BY ts_epoch_ms DESC, id DESC
             LIMIT ?2",
        )
        .bind(channel)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .context("failed to query chat logs")?;

        rows.iter()
            .map(|row| -> Result<ChatLogRecord> {
                Ok(ChatLogRecord {
                    at: row.try_get("ts_iso")?,
                    channel: row.try_get("channel")?,
                    username: row.try_get("username")?,
                    player_id: parse_player_id(&row.try_get::<String, _>("player_id")?)?,
                    message: row.try_get("message")?,
                    dimension: row.try_get("dimension")?,
                    block: block_from_row(row)?,
                })
            })
            .collect()
    }

    pub async fn death_log_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM death_logs")
            .fetch_one(&self.pool)
            .await
            .context("failed to count death logs")?;
        Ok(count)
    }

    pub async fn upsert_mute(&self, mute: &MuteRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO chat_mutes
                (target_id, target_name, actor_id, actor_name, created_at_ms, expires_at_ms, reason)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(target_id) DO UPDATE SET
                target_name = excluded.target_name,
                actor_id = excluded.actor_id,
                actor_name = excluded.actor_name,
                created_at_ms = excluded.created_at_ms,
                expires_at_ms = excluded.expires_at_ms,
                reason = excluded.reason",
        )
        .bind(mute.target.to_string())
        .bind(&mute.target_name)
        .bind(mute.actor.map(|actor| actor.to_string()))
        .bind(&mute.actor_name)
        .bind(mute.created_at.timestamp_millis())
        .bind(mute.expires_at.map(|at| at.timestamp_millis()))
        .bind(&mute.reason)
        .execute(&self.pool)
        .await
        .context("failed to upsert mute")?;
        Ok(())
    }

    pub async fn delete_mute(&self, target: PlayerId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chat_mutes WHERE target_id = ?")
            .bind(target.to_string())
            .execute(&self.pool)
            .await
            .context("failed to delete mute")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn load_mutes(&self) -> Result<Vec<MuteRecord>> {
        let rows = sqlx::query(
            "SELECT target_id, target_name, actor_id, actor_name, created_at_ms, expires_at_ms, reason
             FROM chat_mutes
             ORDER BY created_at_ms DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to load mutes")?;

        rows.iter()
            .map(|row| -> Result<MuteRecord> {
                Ok(MuteRecord {
                    target: parse_player_id(&row.try_get::<String, _>("target_id")?)?,
                    target_name: row.try_get("target_name")?,
                    actor: row
                        .try_get::<Option<String>, _>("actor_id")?
                        .as_deref()
                        .map(parse_player_id)
                        .transpose()?,
                    actor_name: row.try_get("actor_name")?,
                    created_at: from_millis(row.try_get("created_at_ms")?)?,
                    expires_at: row
                        .try_get::<Option<i64>, _>("expires_at_ms")?
                        .map(from_millis)
                        .transpose()?,
                    reason: row.try_get("reason")?,
                })
            })
            .collect()
    }

    pub async fn insert_moderation_action(&self, action: &ModerationAction) -> Result<i64> {
        let (dimension, block) = match &action.actor_location {
            Some((dimension, block)) => (Some(dimension.as_str()), Some(*block)),
            None => (None, None),
        };
        let rec = sqlx::query(
            "INSERT INTO chat_moderation_log
                (ts_epoch_ms, ts_iso, action, actor_id, actor_name, target_id, target_name,
                 duration_ms, expires_at_ms, reason, dimension, x, y, z)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(action.at.timestamp_millis())
        .bind(action.at)
        .bind(action.kind.as_str())
        .bind(action.actor.map(|actor| actor.to_string()))
        .bind(&action.actor_name)
        .bind(action.target.to_string())
        .bind(&action.target_name)
        .bind(action.duration_ms)
        .bind(action.expires_at.map(|at| at.timestamp_millis()))
        .bind(&action.reason)
        .bind(dimension)
        .bind(block.map(|b| b.x))
        .bind(block.map(|b| b.y))
        .bind(block.map(|b| b.z))
        .fetch_one(&self.pool)
        .await
        .context("failed to insert moderation action")?;
        Ok(rec.get::<i64, _>(0))
    }

    /// Newest first.
    pub async fn moderation_history(
        &self,
        target: PlayerId,
        limit: u32,
    ) -> Result<Vec<ModerationAction>> {
        let rows = sqlx::query(
            "SELECT ts_iso, action, actor_id, actor_name, target_id, target_name, duration_ms,
                    expires_at_ms, reason, dimension, x, y, z
             FROM chat_moderation_log
             WHERE target_id = ?
             ORDER BY ts_epoch_ms DESC, id DESC
             LIMIT ?",
        )
        .bind(target.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .context("failed to query moderation history")?;

        rows.iter()
            .map(|row| -> Result<ModerationAction> {
                let raw_kind: String = row.try_get("action")?;
                let kind = ModerationKind::parse(&raw_kind)
                    .with_context(|| format!("unknown moderation action '{raw_kind}'"))?;
                let dimension: Option<String> = row.try_get("dimension")?;
                let actor_location = match dimension {
                    Some(dimension) => Some((
                        dimension,
                        BlockPos {
                            x: row.try_get::<Option<i64>, _>("x")?.unwrap_or_default(),
                            y: row.try_get::<Option<i64>, _>("y")?.unwrap_or_default(),
                            z: row.try_get::<Option<i64>, _>("z")?.unwrap_or_default(),
                        },
                    )),
                    None => None,
                };
                Ok(ModerationAction {
                    at: row.try_get("ts_iso")?,
                    kind,
                    actor: row
                        .try_get::<Option<String>, _>("actor_id")?
                        .as_deref()
                        .map(parse_player_id)
                        .transpose()?,
                    actor_name: row.try_get("actor_name")?,
                    target: parse_player_id(&row.try_get::<String, _>("target_id")?)?,
                    target_name: row.try_get("target_name")?,
                    duration_ms: row.try_get("duration_ms")?,
                    expires_at: row
                        .try_get::<Option<i64>, _>("expires_at_ms")?
                        .map(from_millis)
                        .transpose()?,
                    reason: row.try_get("reason")?,
                    actor_location,
                })
            })
            .collect()
    }
}

fn parse_player_id(raw: &str) -> Result<PlayerId> {
    let uuid = Uuid::parse_str(raw).with_context(|| format!("invalid player id '{raw}'"))?;
    Ok(PlayerId(uuid))
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .with_context(|| format!("timestamp out of range: {ms}"))
}

fn block_from_row(row: &SqliteRow) -> Result<BlockPos> {
    Ok(BlockPos {
        x: row.try_get("x")?,
        y: row.try_get("y")?,
        z: row.try_get("z")?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
