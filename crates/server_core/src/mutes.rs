use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{Arc, PoisonError, RwLock},
};

use chrono::{DateTime, Utc};
use shared::{
    color::NamedColor,
    domain::{MuteRecord, PlayerId},
    text::RichText,
};
use storage::{ModerationAction, ModerationKind};
use tracing::info;

use crate::{
    collaborators::ChatLogSink,
    duration::{format_remaining, MuteDuration},
    world::PlayerSnapshot,
};

pub const SYSTEM_ACTOR: &str = "SYSTEM";

#[derive(Debug, Clone, PartialEq)]
pub enum MuteStatus {
    NotMuted,
    Muted(MuteRecord),
    /// The mute ran out just now and has been lifted.
    Expired(MuteRecord),
}

/// Active mutes keyed by player. Every change is mirrored to the log sink.
pub struct MuteManager {
    mutes: RwLock<HashMap<PlayerId, MuteRecord>>,
    log: Arc<dyn ChatLogSink>,
}

impl MuteManager {
    pub fn new(log: Arc<dyn ChatLogSink>) -> Self {
        Self {
            mutes: RwLock::new(HashMap::new()),
            log,
        }
    }

    /// Replaces the in-memory set with persisted records.
    pub fn restore(&self, records: impl IntoIterator<Item = MuteRecord>) {
        let mut mutes = self.mutes.write().unwrap_or_else(PoisonError::into_inner);
        mutes.clear();
        mutes.extend(records.into_iter().map(|record| (record.target, record)));
    }

    /// Checks and lazily expires the player's mute. Expiry is decided and
    /// applied under one write lock, so a fresh mute placed concurrently is
    /// never lifted and an expiry is reported once.
    pub fn status(&self, player: PlayerId, now: DateTime<Utc>) -> MuteStatus {
        {
            let mutes = self.mutes.read().unwrap_or_else(PoisonError::into_inner);
            match mutes.get(&player) {
                None => return MuteStatus::NotMuted,
                Some(record) if !record.is_expired(now) => return MuteStatus::Muted(record.clone()),
                Some(_) => {}
            }
        }

        let record = {
            let mut mutes = self.mutes.write().unwrap_or_else(PoisonError::into_inner);
            match mutes.entry(player) {
                Entry::Vacant(_) => return MuteStatus::NotMuted,
                Entry::Occupied(entry) if !entry.get().is_expired(now) => {
                    return MuteStatus::Muted(entry.get().clone())
                }
                Entry::Occupied(entry) => {
                    // Queued while the lock is held so the sink sees map order.
                    self.log.forget_mute(player);
                    entry.remove()
                }
            }
        };

        self.log.log_moderation(ModerationAction {
            at: now,
            kind: ModerationKind::AutoUnmute,
            actor: None,
            actor_name: SYSTEM_ACTOR.to_string(),
            target: player,
            target_name: record.target_name.clone(),
            duration_ms: None,
            expires_at: record.expires_at,
            reason: None,
            actor_location: None,
        });
        info!(target_id = %player, "mute expired");
        MuteStatus::Expired(record)
    }

    pub fn get(&self, player: PlayerId) -> Option<MuteRecord> {
        self.mutes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&player)
            .cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Option<MuteRecord> {
        self.mutes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|record| {
                record
                    .target_name
                    .as_deref()
                    .is_some_and(|target| target.eq_ignore_ascii_case(name))
            })
            .cloned()
    }

    pub fn mute(
        &self,
        target: PlayerId,
        target_name: Option<String>,
        actor: &PlayerSnapshot,
        duration: MuteDuration,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> MuteRecord {
        let expires_at = match duration {
            MuteDuration::Permanent => None,
            MuteDuration::For(length) => Some(now + length),
        };
        let record = MuteRecord {
            target,
            target_name: target_name.clone(),
            actor: Some(actor.id),
            actor_name: actor.name.clone(),
            created_at: now,
            expires_at,
            reason: reason.clone(),
        };
        {
            let mut mutes = self.mutes.write().unwrap_or_else(PoisonError::into_inner);
            mutes.insert(target, record.clone());
            self.log.persist_mute(record.clone());
        }
        self.log.log_moderation(ModerationAction {
            at: now,
            kind: ModerationKind::Mute,
            actor: Some(actor.id),
            actor_name: actor.name.clone(),
            target,
            target_name,
            duration_ms: duration.as_millis(),
            expires_at,
            reason,
            actor_location: Some((
                actor.location.dimension.to_string(),
                actor.location.position.block(),
            )),
        });
        info!(target_id = %target, actor = %actor.name, "player muted");
        record
    }

    pub fn unmute(
        &self,
        target: PlayerId,
        actor: &PlayerSnapshot,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Option<MuteRecord> {
        let removed = {
            let mut mutes = self.mutes.write().unwrap_or_else(PoisonError::into_inner);
            let removed = mutes.remove(&target)?;
            self.log.forget_mute(target);
            removed
        };
        self.log.log_moderation(ModerationAction {
            at: now,
            kind: ModerationKind::Unmute,
            actor: Some(actor.id),
            actor_name: actor.name.clone(),
            target,
            target_name: removed.target_name.clone(),
            duration_ms: None,
            expires_at: removed.expires_at,
            reason,
            actor_location: Some((
                actor.location.dimension.to_string(),
                actor.location.position.block(),
            )),
        });
        info!(target_id = %target, actor = %actor.name, "player unmuted");
        Some(removed)
    }

    /// Active mutes, newest first. Expired entries are skipped, not removed.
    pub fn list(&self, now: DateTime<Utc>) -> Vec<MuteRecord> {
        let mut records: Vec<MuteRecord> = self
            .mutes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|record| !record.is_expired(now))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }
}

pub fn muted_notice(record: &MuteRecord, now: DateTime<Utc>) -> RichText {
    let mut text = format!(
        "You are muted ({}).",
        format_remaining(record.remaining(now))
    );
    if let Some(reason) = &record.reason {
        text.push_str(&format!(" Reason: {reason}"));
    }
    RichText::literal(text).with_color(NamedColor::Red)
}

pub fn auto_unmute_notice() -> RichText {
    RichText::literal("Your mute has expired.").with_color(NamedColor::Green)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Duration;
    use shared::domain::Location;
    use storage::{ChatLogRecord, DeathLogRecord};

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        actions: Mutex<Vec<ModerationKind>>,
        persisted: Mutex<Vec<PlayerId>>,
        forgotten: Mutex<Vec<PlayerId>>,
    }

    impl ChatLogSink for RecordingSink {
        fn log_chat(&self, _record: ChatLogRecord) {}
        fn log_death(&self, _record: DeathLogRecord) {}
        fn persist_mute(&self, mute: MuteRecord) {
            self.persisted.lock().expect("lock").push(mute.target);
        }
        fn forget_mute(&self, target: PlayerId) {
            self.forgotten.lock().expect("lock").push(target);
        }
        fn log_moderation(&self, action: ModerationAction) {
            self.actions.lock().expect("lock").push(action.kind);
        }
    }

    fn moderator() -> PlayerSnapshot {
        PlayerSnapshot::new(PlayerId::new_random(), "Mod", Location::default())
    }

    #[test]
    fn timed_mute_expires_lazily_and_is_logged() {
        let sink = Arc::new(RecordingSink::default());
        let mutes = MuteManager::new(sink.clone());
        let target = PlayerId::new_random();
        let now = Utc::now();

        mutes.mute(target, Some("Spammer".into()), &moderator(), MuteDuration::For(Duration::minutes(10)), None, now);
        assert!(matches!(mutes.status(target, now + Duration::minutes(9)), MuteStatus::Muted(_)));
        assert!(matches!(mutes.status(target, now + Duration::minutes(10)), MuteStatus::Expired(_)));
        assert_eq!(mutes.status(target, now + Duration::minutes(11)), MuteStatus::NotMuted);

        assert_eq!(
            *sink.actions.lock().expect("lock"),
            vec![ModerationKind::Mute, ModerationKind::AutoUnmute]
        );
        assert_eq!(*sink.persisted.lock().expect("lock"), vec![target]);
        assert_eq!(*sink.forgotten.lock().expect("lock"), vec![target]);
    }

    #[test]
    fn racing_checks_lift_an_expired_mute_once_and_keep_a_fresh_one() {
        use std::sync::Barrier;

        let sink = Arc::new(RecordingSink::default());
        let mutes = MuteManager::new(sink.clone());
        let target = PlayerId::new_random();
        let now = Utc::now();
        mutes.mute(target, None, &moderator(), MuteDuration::For(Duration::minutes(1)), None, now);
        let later = now + Duration::minutes(5);

        let barrier = Barrier::new(9);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    barrier.wait();
                    for _ in 0..50 {
                        mutes.status(target, later);
                    }
                });
            }
            scope.spawn(|| {
                barrier.wait();
                mutes.mute(target, None, &moderator(), MuteDuration::Permanent, None, later);
            });
        });

        assert!(matches!(mutes.status(target, later), MuteStatus::Muted(_)));
        let actions = sink.actions.lock().expect("lock").clone();
        let auto_unmutes = actions.iter().filter(|kind| **kind == ModerationKind::AutoUnmute).count();
        assert!(auto_unmutes <= 1, "{actions:?}");
        // The last sink call for the player leaves the fresh mute persisted.
        let forgotten = sink.forgotten.lock().expect("lock").len();
        assert!(forgotten <= 1);
        assert_eq!(sink.persisted.lock().expect("lock").len(), 2);
    }

    #[test]
    fn expired_then_remuted_stays_muted() {
        let sink = Arc::new(RecordingSink::default());
        let mutes = MuteManager::new(sink.clone());
        let target = PlayerId::new_random();
        let now = Utc::now();
        mutes.mute(target, None, &moderator(), MuteDuration::For(Duration::minutes(1)), None, now);
        let later = now + Duration::minutes(2);
        mutes.mute(target, None, &moderator(), MuteDuration::Permanent, None, later);

        assert!(matches!(mutes.status(target, later), MuteStatus::Muted(_)));
        assert!(sink.forgotten.lock().expect("lock").is_empty());
        assert!(!sink.actions.lock().expect("lock").contains(&ModerationKind::AutoUnmute));
    }

    #[test]
    fn permanent_mute_until_unmuted() {
        let sink = Arc::new(RecordingSink::default());
        let mutes = MuteManager::new(sink.clone());
        let target = PlayerId::new_random();
        let now = Utc::now();

        mutes.mute(target, None, &moderator(), MuteDuration::Permanent, Some("abuse".into()), now);
        assert!(matches!(mutes.status(target, now + Duration::days(365)), MuteStatus::Muted(_)));
        assert!(mutes.unmute(target, &moderator(), None, now).is_some());
        assert!(mutes.unmute(target, &moderator(), None, now).is_none());
        assert_eq!(mutes.status(target, now), MuteStatus::NotMuted);
    }

    #[test]
    fn list_is_newest_first_and_lookup_by_name() {
        let mutes = MuteManager::new(Arc::new(RecordingSink::default()));
        let now = Utc::now();
        let first = PlayerId::new_random();
        let second = PlayerId::new_random();
        mutes.mute(first, Some("First".into()), &moderator(), MuteDuration::Permanent, None, now);
        mutes.mute(second, Some("Second".into()), &moderator(), MuteDuration::Permanent, None, now + Duration::seconds(1));

        let listed: Vec<_> = mutes.list(now + Duration::seconds(2)).into_iter().map(|m| m.target).collect();
        assert_eq!(listed, vec![second, first]);
        assert_eq!(mutes.find_by_name("second").map(|m| m.target), Some(second));
    }

    #[test]
    fn notice_mentions_remaining_and_reason() {
        let now = Utc::now();
        let record = MuteRecord {
            target: PlayerId::new_random(),
            target_name: None,
            actor: None,
            actor_name: "Mod".into(),
            created_at: now,
            expires_at: Some(now + Duration::minutes(5)),
            reason: Some("caps".into()),
        };
        assert_eq!(muted_notice(&record, now).plain_text(), "You are muted (5m 0s). Reason: caps");
    }
}
