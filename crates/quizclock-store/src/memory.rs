//! In-process attempt store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use quizclock_core::error::StoreError;
use quizclock_core::model::{AttemptKey, SavedAttempt};
use quizclock_core::traits::AttemptStore;

/// An attempt store backed by a map.
///
/// Records live only as long as the store. Useful for tests and for
/// practice sessions where nothing needs to survive the process.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<AttemptKey, SavedAttempt>>,
    /// Number of successful saves.
    save_count: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of saves made to this store.
    pub fn save_count(&self) -> u32 {
        self.save_count.load(Ordering::Relaxed)
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<AttemptKey, SavedAttempt>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, key: &AttemptKey) -> Result<Option<SavedAttempt>, StoreError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn save(&self, key: &AttemptKey, record: &SavedAttempt) -> Result<(), StoreError> {
        self.lock().insert(key.clone(), record.clone());
        self.save_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn delete(&self, key: &AttemptKey) -> Result<(), StoreError> {
        self.lock().remove(key);
        Ok(())
    }

    async fn list(&self, quiz_id: &str) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self
            .lock()
            .keys()
            .filter(|k| k.quiz_id == quiz_id)
            .map(|k| k.attempt_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}
