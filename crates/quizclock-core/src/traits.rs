//! Core trait definitions for attempt storage and time.
//!
//! `AttemptStore` is implemented by the `quizclock-store` crate. `Clock`
//! lets the engine compare against wall-clock time while tests drive a
//! manual clock.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::StoreError;
use crate::model::{AttemptKey, SavedAttempt};

// ---------------------------------------------------------------------------
// Attempt store
// ---------------------------------------------------------------------------

/// Durable key-value persistence of in-progress attempts.
///
/// The engine treats every write as best-effort: a failing `save` is logged
/// and the in-memory attempt stays authoritative.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Human-readable store name (e.g. "file").
    fn name(&self) -> &str;

    /// Load the last persisted record. A missing key is `Ok(None)`.
    async fn load(&self, key: &AttemptKey) -> Result<Option<SavedAttempt>, StoreError>;

    /// Overwrite the record for `key`. Calling it twice with the same
    /// record is harmless.
    async fn save(&self, key: &AttemptKey, record: &SavedAttempt) -> Result<(), StoreError>;

    /// Remove a record. Only external cleanup calls this, never the engine.
    async fn delete(&self, key: &AttemptKey) -> Result<(), StoreError>;

    /// Attempt ids with a saved record for `quiz_id`, sorted.
    async fn list(&self, quiz_id: &str) -> Result<Vec<String>, StoreError>;
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The host's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
