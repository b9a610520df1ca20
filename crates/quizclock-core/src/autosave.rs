//! Best-effort persistence of in-progress attempts.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::model::{AttemptKey, SavedAttempt};
use crate::traits::AttemptStore;

/// Periodic save cadence while an attempt is in progress.
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(12);

/// Why a save was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    /// The attempt started and a deadline was fixed.
    Started,
    AnswerChanged,
    Interval,
    Completed,
    /// The session ended before completion.
    Left,
}

impl fmt::Display for SaveTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveTrigger::Started => write!(f, "started"),
            SaveTrigger::AnswerChanged => write!(f, "answer changed"),
            SaveTrigger::Interval => write!(f, "interval"),
            SaveTrigger::Completed => write!(f, "completed"),
            SaveTrigger::Left => write!(f, "left"),
        }
    }
}

/// Writes attempt snapshots to a store and swallows failures.
#[derive(Debug, Clone)]
pub struct AutosaveScheduler {
    interval: Duration,
    saves: u32,
    failures: u32,
}

impl AutosaveScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            saves: 0,
            failures: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Successful saves so far.
    pub fn saves(&self) -> u32 {
        self.saves
    }

    /// Failed saves so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Save `record` under `key`. Returns the save time on success.
    ///
    /// A failing store is logged and otherwise ignored.
    pub async fn persist(
        &mut self,
        store: &dyn AttemptStore,
        key: &AttemptKey,
        record: &SavedAttempt,
        now: DateTime<Utc>,
        trigger: SaveTrigger,
    ) -> Option<DateTime<Utc>> {
        let mut record = record.clone();
        record.saved_at = Some(now);

        match store.save(key, &record).await {
            Ok(()) => {
                self.saves += 1;
                tracing::debug!(%key, %trigger, store = store.name(), "attempt saved");
                Some(now)
            }
            Err(e) => {
                self.failures += 1;
                tracing::warn!(%key, %trigger, "autosave failed, continuing in memory: {e}");
                None
            }
        }
    }
}

impl Default for AutosaveScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOSAVE_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_support::RecordingStore;

    #[tokio::test]
    async fn successful_save_stamps_time() {
        let store = RecordingStore::default();
        let key = AttemptKey::new("quiz", "a1");
        let now = Utc::now();
        let mut autosave = AutosaveScheduler::default();

        let saved = autosave
            .persist(&store, &key, &SavedAttempt::default(), now, SaveTrigger::Interval)
            .await;
        assert_eq!(saved, Some(now));
        assert_eq!(autosave.saves(), 1);

        let stored = store.get(&key).unwrap();
        assert_eq!(stored.saved_at, Some(now));
    }

    #[tokio::test]
    async fn redundant_saves_overwrite() {
        let store = RecordingStore::default();
        let key = AttemptKey::new("quiz", "a1");
        let mut autosave = AutosaveScheduler::default();
        let mut record = SavedAttempt::default();
        record.answers.insert("q1".into(), "a".into());

        for _ in 0..3 {
            autosave
                .persist(&store, &key, &record, Utc::now(), SaveTrigger::AnswerChanged)
                .await;
        }
        assert_eq!(store.save_count(), 3);
        assert_eq!(store.get(&key).unwrap().answers, record.answers);
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let store = RecordingStore::failing();
        let key = AttemptKey::new("quiz", "a1");
        let mut autosave = AutosaveScheduler::new(Duration::from_secs(5));

        let saved = autosave
            .persist(
                &store,
                &key,
                &SavedAttempt::default(),
                Utc::now(),
                SaveTrigger::AnswerChanged,
            )
            .await;
        assert_eq!(saved, None);
        assert_eq!(autosave.failures(), 1);
        assert_eq!(autosave.saves(), 0);
        assert_eq!(autosave.interval(), Duration::from_secs(5));
    }
}
