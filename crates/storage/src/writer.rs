use shared::domain::{MuteRecord, PlayerId};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{ChatLogRecord, DeathLogRecord, ModerationAction, Storage};

/// Work item for the background log worker.
#[derive(Debug)]
pub enum LogJob {
    Chat(ChatLogRecord),
    Death(DeathLogRecord),
    UpsertMute(MuteRecord),
    DeleteMute(PlayerId),
    Moderation(ModerationAction),
    Flush(oneshot::Sender<()>),
}

impl LogJob {
    fn kind(&self) -> &'static str {
        match self {
            LogJob::Chat(_) => "chat",
            LogJob::Death(_) => "death",
            LogJob::UpsertMute(_) => "upsert_mute",
            LogJob::DeleteMute(_) => "delete_mute",
            LogJob::Moderation(_) => "moderation",
            LogJob::Flush(_) => "flush",
        }
    }
}

/// Serialises all log writes onto one worker task so callers never block on
/// the database. A failed write drops the connection; the next job reconnects.
#[derive(Clone, Default)]
pub struct LogWriter {
    tx: Option<mpsc::UnboundedSender<LogJob>>,
}

impl LogWriter {
    /// A writer that accepts and discards every job.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Starts the worker; the first job opens the database lazily.
    pub fn spawn(database_url: impl Into<String>) -> (Self, JoinHandle<()>) {
        Self::start(database_url.into(), None)
    }

    /// Starts the worker on an already-open database.
    pub fn spawn_with_storage(
        storage: Storage,
        database_url: impl Into<String>,
    ) -> (Self, JoinHandle<()>) {
        Self::start(database_url.into(), Some(storage))
    }

    fn start(database_url: String, storage: Option<Storage>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(database_url, storage, rx));
        (Self { tx: Some(tx) }, handle)
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    pub fn submit(&self, job: LogJob) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(error) = tx.send(job) {
            warn!(kind = error.0.kind(), "log worker stopped; dropping job");
        }
    }

    /// Resolves once every job submitted before the call has been handled.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.submit(LogJob::Flush(done_tx));
        if self.tx.is_some() {
            let _ = done_rx.await;
        }
    }
}

async fn run_worker(
    database_url: String,
    mut storage: Option<Storage>,
    mut rx: mpsc::UnboundedReceiver<LogJob>,
) {
    while let Some(job) = rx.recv().await {
        if let LogJob::Flush(done) = job {
            let _ = done.send(());
            continue;
        }

        if storage.is_none() {
            match Storage::new(&database_url).await {
                Ok(opened) => storage = Some(opened),
                Err(error) => {
                    warn!(%error, kind = job.kind(), "log database unavailable; dropping job");
                    continue;
                }
            }
        }
        let Some(db) = storage.as_ref() else {
            continue;
        };

        let kind = job.kind();
        if let Err(error) = apply(db, job).await {
            warn!(%error, kind, "log write failed; reconnecting on next job");
            if let Some(db) = storage.take() {
                db.close().await;
            }
        } else {
            debug!(kind, "log job written");
        }
    }
}

async fn apply(storage: &Storage, job: LogJob) -> anyhow::Result<()> {
    match job {
        LogJob::Chat(record) => {
            storage.insert_chat_log(&record).await?;
        }
        LogJob::Death(record) => {
            storage.insert_death_log(&record).await?;
        }
        LogJob::UpsertMute(mute) => storage.upsert_mute(&mute).await?,
        LogJob::DeleteMute(target) => {
            storage.delete_mute(target).await?;
        }
        LogJob::Moderation(action) => {
            storage.insert_moderation_action(&action).await?;
        }
        LogJob::Flush(done) => {
            let _ = done.send(());
        }
    }
    Ok(())
}
