//! Attempt store backed by a directory of JSON files.
//!
//! Layout: `<root>/<quiz_id>/<attempt_id>.json`, with both ids encoded
//! reversibly. Each write goes to a temporary file in the same directory and
//! is then renamed over the old record, so a reader never sees a
//! half-written file.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use quizclock_core::error::StoreError;
use quizclock_core::model::{AttemptKey, SavedAttempt};
use quizclock_core::traits::AttemptStore;

/// Stores one JSON record per attempt.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn quiz_dir(&self, quiz_id: &str) -> PathBuf {
        self.root.join(encode_component(quiz_id))
    }

    /// Path of the record for `key`.
    pub fn record_path(&self, key: &AttemptKey) -> PathBuf {
        self.quiz_dir(&key.quiz_id)
            .join(format!("{}.json", encode_component(&key.attempt_id)))
    }
}

/// Map an id onto a file name component, reversibly.
///
/// Non-empty ids made only of `[A-Za-z0-9_-]` are used as-is. Anything else
/// becomes `%` followed by the hex of its bytes; `%` never appears in a
/// verbatim id, so the two forms cannot collide.
fn encode_component(id: &str) -> String {
    let verbatim = !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if verbatim {
        id.to_string()
    } else {
        format!("%{}", hex::encode(id))
    }
}

fn decode_component(name: &str) -> Option<String> {
    match name.strip_prefix('%') {
        Some(encoded) => String::from_utf8(hex::decode(encoded).ok()?).ok(),
        None => Some(name.to_string()),
    }
}

#[async_trait]
impl AttemptStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self, key: &AttemptKey) -> Result<Option<SavedAttempt>, StoreError> {
        let path = self.record_path(key);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Malformed {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    async fn save(&self, key: &AttemptKey, record: &SavedAttempt) -> Result<(), StoreError> {
        let write_failed = |message: String| StoreError::WriteFailed {
            key: key.to_string(),
            message,
        };

        let dir = self.quiz_dir(&key.quiz_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| write_failed(format!("failed to create {}: {e}", dir.display())))?;

        let json = serde_json::to_string_pretty(record).map_err(|e| write_failed(e.to_string()))?;

        let path = self.record_path(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| write_failed(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| write_failed(format!("failed to replace {}: {e}", path.display())))?;

        tracing::trace!(path = %path.display(), "record written");
        Ok(())
    }

    async fn delete(&self, key: &AttemptKey) -> Result<(), StoreError> {
        let path = self.record_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::WriteFailed {
                key: key.to_string(),
                message: format!("failed to remove {}: {e}", path.display()),
            }),
        }
    }

    async fn list(&self, quiz_id: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.quiz_dir(quiz_id);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "failed to read {}: {e}",
                    dir.display()
                )))
            }
        };

        let mut ids = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    return Err(StoreError::Unavailable(format!(
                        "failed to read {}: {e}",
                        dir.display()
                    )))
                }
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(decode_component);
            match id {
                Some(id) => ids.push(id),
                None => {
                    tracing::warn!(path = %path.display(), "skipping unrecognised record file")
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};

    fn record() -> SavedAttempt {
        let mut record = SavedAttempt {
            deadline_at: Some(Utc.with_ymd_and_hms(2026, 3, 1, 10, 5, 0).unwrap()),
            ..Default::default()
        };
        record.answers.insert("q1".into(), "b".into());
        record
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let key = AttemptKey::new("rust-basics", "a1");

        store.save(&key, &record()).await.unwrap();
        assert!(store.record_path(&key).exists());

        let loaded = store.load(&key).await.unwrap().unwrap();
        assert_eq!(loaded.answers["q1"], "b");
        assert_eq!(loaded.deadline_at, record().deadline_at);
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let loaded = store.load(&AttemptKey::new("q", "a")).await.unwrap();
        assert!(loaded.is_none());
        assert!(store.list("q").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn garbage_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let key = AttemptKey::new("q", "a");
        let path = store.record_path(&key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        let err = store.load(&key).await.unwrap_err();
        assert!(err.is_malformed());
    }

    #[tokio::test]
    async fn no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let key = AttemptKey::new("q", "a");
        store.save(&key, &record()).await.unwrap();
        store.save(&key, &SavedAttempt::default()).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path().join("q"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json"]);
        assert!(store.load(&key).await.unwrap().unwrap().answers.is_empty());
    }

    #[tokio::test]
    async fn list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save(&AttemptKey::new("q", "b"), &record()).await.unwrap();
        store.save(&AttemptKey::new("q", "a"), &record()).await.unwrap();
        store.save(&AttemptKey::new("other", "c"), &record()).await.unwrap();

        assert_eq!(store.list("q").await.unwrap(), vec!["a", "b"]);

        store.delete(&AttemptKey::new("q", "a")).await.unwrap();
        store.delete(&AttemptKey::new("q", "a")).await.unwrap();
        assert_eq!(store.list("q").await.unwrap(), vec!["b"]);
    }

    #[test]
    fn ids_cannot_escape_root() {
        let store = FileStore::new("/data");
        let path = store.record_path(&AttemptKey::new("../etc", "x/y"));
        assert_eq!(path, PathBuf::from("/data/%2e2e2f657463/%782f79.json"));
        assert_eq!(encode_component("alice_1"), "alice_1");
        assert_eq!(encode_component(""), "%");
    }

    #[test]
    fn encoding_round_trips() {
        for id in ["alice_1", "alice.1", "x/y", "%41", "", "日本"] {
            assert_eq!(decode_component(&encode_component(id)).as_deref(), Some(id));
        }
        assert!(decode_component("%zz").is_none());
    }

    #[tokio::test]
    async fn similar_ids_do_not_share_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store
            .save(&AttemptKey::new("q", "alice.1"), &record())
            .await
            .unwrap();

        for neighbour in ["alice_1", "alice-1", "alice%2e1"] {
            let loaded = store.load(&AttemptKey::new("q", neighbour)).await.unwrap();
            assert!(loaded.is_none(), "{neighbour} read another attempt's record");
        }
        assert!(store.load(&AttemptKey::new("q_", "alice.1")).await.unwrap().is_none());
        assert!(store.load(&AttemptKey::new("q", "alice.1")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn list_returns_original_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        for id in ["x/y", "x_y", "alice.1"] {
            store.save(&AttemptKey::new("quiz 1", id), &record()).await.unwrap();
        }
        assert_eq!(
            store.list("quiz 1").await.unwrap(),
            vec!["alice.1", "x/y", "x_y"]
        );
        assert!(store.list("quiz_1").await.unwrap().is_empty());
    }
}
