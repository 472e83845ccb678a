//! Recording persistence boundary
//!
//! The player never talks to a backend directly. A `RecordingStore` is
//! constructed by the host and passed in, so tests can swap it for an
//! in-memory one.
//!
//! `BundleRecordingStore` reads recordings exported to a directory:
//! - `<id>.json`: the recording entity, file name URL-encoded

use super::schema::Recording;
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;

/// Source of persisted recordings
#[async_trait]
pub trait RecordingStore: Send + Sync {
    /// Fetch a recording by id. `Ok(None)` means no such recording.
    async fn fetch(&self, id: &str) -> AppResult<Option<Recording>>;
}

/// Recordings stored as JSON files in a directory
pub struct BundleRecordingStore {
    root: PathBuf,
}

impl BundleRecordingStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the file holding a recording
    pub fn recording_path(&self, id: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", urlencoding::encode(id), RECORDING_EXTENSION))
    }

    /// Persist a recording (used by import tooling and tests)
    pub async fn write(&self, recording: &Recording) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let content = serde_json::to_string_pretty(recording)?;
        tokio::fs::write(self.recording_path(&recording.id), content).await?;

        tracing::debug!("Saved recording '{}' to {:?}", recording.id, self.root);
        Ok(())
    }
}

#[async_trait]
impl RecordingStore for BundleRecordingStore {
    async fn fetch(&self, id: &str) -> AppResult<Option<Recording>> {
        let path = self.recording_path(id);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No recording file at {:?}", path);
                return Ok(None);
            }
            Err(e) => return Err(AppError::Io(e)),
        };

        let recording: Recording = serde_json::from_str(&content)?;
        if recording.id != id {
            return Err(AppError::Store(format!(
                "file {:?} holds recording '{}', expected '{}'",
                path, recording.id, id
            )));
        }

        tracing::debug!("Loaded recording '{}' from {:?}", recording.title, path);
        Ok(Some(recording))
    }
}

/// In-memory store for headless use and tests
#[derive(Default)]
pub struct MemoryRecordingStore {
    recordings: RwLock<HashMap<String, Recording>>,
}

impl MemoryRecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, recording: Recording) {
        self.recordings.write().insert(recording.id.clone(), recording);
    }
}

#[async_trait]
impl RecordingStore for MemoryRecordingStore {
    async fn fetch(&self, id: &str) -> AppResult<Option<Recording>> {
        Ok(self.recordings.read().get(id).cloned())
    }
}

/// File extension for stored recordings
pub const RECORDING_EXTENSION: &str = "json";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::schema::RecordingMetadata;
    use chrono::Utc;
    use tempfile::tempdir;

    fn recording(id: &str) -> Recording {
        Recording {
            id: id.to_string(),
            title: "Signup bug".to_string(),
            url: Some("https://cdn.example.com/video.webm".to_string()),
            duration: Some(42.0),
            created_at: Utc::now(),
            metadata: RecordingMetadata::default(),
        }
    }

    #[tokio::test]
    async fn test_write_and_fetch_recording() {
        let dir = tempdir().unwrap();
        let store = BundleRecordingStore::new(dir.path().join("recordings"));

        store.write(&recording("abc/123")).await.unwrap();

        let loaded = store.fetch("abc/123").await.unwrap().unwrap();
        assert_eq!(loaded.title, "Signup bug");
        assert_eq!(loaded.duration, Some(42.0));
        assert!(store.recording_path("abc/123").exists());
    }

    #[tokio::test]
    async fn test_missing_recording_is_none() {
        let dir = tempdir().unwrap();
        let store = BundleRecordingStore::new(dir.path());

        assert!(store.fetch("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_recording_is_error() {
        let dir = tempdir().unwrap();
        let store = BundleRecordingStore::new(dir.path());
        std::fs::write(store.recording_path("bad"), "{ not json").unwrap();

        assert!(matches!(
            store.fetch("bad").await,
            Err(AppError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryRecordingStore::new();
        store.insert(recording("r1"));

        assert!(store.fetch("r1").await.unwrap().is_some());
        assert!(store.fetch("r2").await.unwrap().is_none());
    }
}
