//! In-crate test doubles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::model::{AttemptKey, SavedAttempt};
use crate::traits::{AttemptStore, Clock};

/// Map-backed store that counts writes and can be told to fail.
#[derive(Default)]
pub struct RecordingStore {
    fail_writes: bool,
    records: Mutex<HashMap<AttemptKey, SavedAttempt>>,
    corrupted: Mutex<Vec<AttemptKey>>,
    saves: AtomicU32,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    pub fn get(&self, key: &AttemptKey) -> Option<SavedAttempt> {
        self.records.lock().unwrap().get(key).cloned()
    }

    pub fn save_count(&self) -> u32 {
        self.saves.load(Ordering::Relaxed)
    }

    /// Make `load` report the record as unparsable.
    pub fn corrupt(&self, key: AttemptKey) {
        self.corrupted.lock().unwrap().push(key);
    }
}

#[async_trait]
impl AttemptStore for RecordingStore {
    fn name(&self) -> &str {
        "recording"
    }

    async fn load(&self, key: &AttemptKey) -> Result<Option<SavedAttempt>, StoreError> {
        if self.corrupted.lock().unwrap().contains(key) {
            return Err(StoreError::Malformed {
                key: key.to_string(),
                message: "expected value at line 1 column 1".into(),
            });
        }
        Ok(self.get(key))
    }

    async fn save(&self, key: &AttemptKey, record: &SavedAttempt) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::WriteFailed {
                key: key.to_string(),
                message: "quota exceeded".into(),
            });
        }
        self.saves.fetch_add(1, Ordering::Relaxed);
        self.records
            .lock()
            .unwrap()
            .insert(key.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, key: &AttemptKey) -> Result<(), StoreError> {
        self.records.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self, quiz_id: &str) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self
            .records
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.quiz_id == quiz_id)
            .map(|k| k.attempt_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

/// Wall-clock time that follows tokio's (possibly paused) clock.
pub struct AnchoredClock {
    base: DateTime<Utc>,
    origin: tokio::time::Instant,
}

impl AnchoredClock {
    pub fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Clock for AnchoredClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed()).unwrap();
        self.base + elapsed
    }
}
