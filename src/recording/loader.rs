//! Recording load pipeline
//!
//! Turns a recording id into a `LoadedRecording`: the entity from the store
//! plus its three decoded log families. Only the entity fetch can fail the
//! load; every log family degrades to empty on its own.

use super::fetch::LogFetcher;
use super::schema::{
    decode_family, ConsoleLogEntry, NetworkLogEntry, Recording, ReplayEvent,
};
use super::store::RecordingStore;
use crate::utils::error::AppResult;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Where a log family came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FamilySource {
    Inline,
    Remote,
    /// Not present, or present but unusable
    Unavailable,
}

/// Which parts of a recording are usable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataAvailability {
    pub video: bool,
    pub replay_events: FamilySource,
    pub console_logs: FamilySource,
    pub network_logs: FamilySource,
}

/// A recording with all side data resolved. Immutable for the life of a view.
#[derive(Debug, Clone)]
pub struct LoadedRecording {
    pub recording: Recording,
    pub replay_events: Arc<[ReplayEvent]>,
    pub console_logs: Arc<[ConsoleLogEntry]>,
    pub network_logs: Arc<[NetworkLogEntry]>,
    pub availability: DataAvailability,
}

impl LoadedRecording {
    fn assemble(
        mut recording: Recording,
        replay: (Vec<ReplayEvent>, FamilySource),
        console: (Vec<ConsoleLogEntry>, FamilySource),
        network: (Vec<NetworkLogEntry>, FamilySource),
    ) -> Self {
        let availability = DataAvailability {
            video: recording.has_video(),
            replay_events: replay.1,
            console_logs: console.1,
            network_logs: network.1,
        };

        // The decoded copies are the source of truth from here on.
        recording.metadata.rrweb_events = None;
        recording.metadata.console_logs = None;
        recording.metadata.network_logs = None;

        Self {
            recording,
            replay_events: replay.0.into(),
            console_logs: console.0.into(),
            network_logs: network.0.into(),
            availability,
        }
    }
}

/// Loads recordings from an injected store and fetcher
pub struct RecordingLoader {
    store: Arc<dyn RecordingStore>,
    fetcher: Arc<dyn LogFetcher>,
}

impl RecordingLoader {
    pub fn new(store: Arc<dyn RecordingStore>, fetcher: Arc<dyn LogFetcher>) -> Self {
        Self { store, fetcher }
    }

    /// Load a recording and resolve its log families.
    ///
    /// Returns `Ok(None)` when the store has no such recording.
    pub async fn load(&self, id: &str) -> AppResult<Option<LoadedRecording>> {
        let Some(recording) = self.store.fetch(id).await? else {
            tracing::info!("Recording {} not found", id);
            return Ok(None);
        };

        tracing::info!("Loading recording {} ({})", recording.id, recording.title);

        let metadata = &recording.metadata;
        let (replay, console, network) = tokio::join!(
            self.resolve::<ReplayEvent>(
                metadata.rrweb_events.as_ref(),
                metadata.rrweb_events_url.as_deref(),
                "rrwebEvents",
            ),
            self.resolve::<ConsoleLogEntry>(
                metadata.console_logs.as_ref(),
                metadata.console_logs_url.as_deref(),
                "consoleLogs",
            ),
            self.resolve::<NetworkLogEntry>(
                metadata.network_logs.as_ref(),
                metadata.network_logs_url.as_deref(),
                "networkLogs",
            ),
        );

        let loaded = LoadedRecording::assemble(recording, replay, console, network);
        tracing::debug!(
            "Recording {} loaded: {} replay events, {} console, {} network",
            loaded.recording.id,
            loaded.replay_events.len(),
            loaded.console_logs.len(),
            loaded.network_logs.len()
        );
        Ok(Some(loaded))
    }

    async fn resolve<T: DeserializeOwned>(
        &self,
        inline: Option<&Value>,
        url: Option<&str>,
        family: &str,
    ) -> (Vec<T>, FamilySource) {
        if inline.is_some_and(|v| !v.is_null()) {
            return resolve_inline(inline, family);
        }

        let Some(url) = url.filter(|u| !u.trim().is_empty()) else {
            return (Vec::new(), FamilySource::Unavailable);
        };

        match self.fetcher.fetch_json(url).await {
            Ok(value) => match decode(&value, family) {
                Some(entries) => (entries, FamilySource::Remote),
                None => (Vec::new(), FamilySource::Unavailable),
            },
            Err(e) => {
                tracing::warn!("{} unavailable, fetch failed: {:#}", family, e);
                (Vec::new(), FamilySource::Unavailable)
            }
        }
    }
}

fn resolve_inline<T: DeserializeOwned>(
    inline: Option<&Value>,
    family: &str,
) -> (Vec<T>, FamilySource) {
    match inline.filter(|v| !v.is_null()).and_then(|v| decode(v, family)) {
        Some(entries) => (entries, FamilySource::Inline),
        None => (Vec::new(), FamilySource::Unavailable),
    }
}

fn decode<T: DeserializeOwned>(value: &Value, family: &str) -> Option<Vec<T>> {
    match decode_family::<T>(value) {
        Some((entries, skipped)) => {
            if skipped > 0 {
                tracing::warn!("Skipped {} malformed {} entries", skipped, family);
            }
            Some(entries)
        }
        None => {
            tracing::warn!("{} is not an array, treating as unavailable", family);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::store::MemoryRecordingStore;
    use anyhow::bail;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::HashMap;

    /// Serves canned documents; unknown URLs fail like a 404
    #[derive(Default)]
    struct FakeFetcher {
        documents: HashMap<String, Value>,
        requested: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LogFetcher for FakeFetcher {
        async fn fetch_json(&self, url: &str) -> anyhow::Result<Value> {
            self.requested.lock().push(url.to_string());
            match self.documents.get(url) {
                Some(doc) => Ok(doc.clone()),
                None => bail!("{} responded with 404 Not Found", url),
            }
        }
    }

    fn store_with(recording: Value) -> Arc<MemoryRecordingStore> {
        let store = MemoryRecordingStore::new();
        store.insert(serde_json::from_value(recording).unwrap());
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_load_inline_families() {
        let store = store_with(json!({
            "id": "r1",
            "title": "Inline",
            "url": "https://cdn.example.com/r1.webm",
            "createdAt": "2024-03-01T10:00:00Z",
            "metadata": {
                "rrwebEvents": [{"type": 4, "timestamp": 500.0, "data": {}}],
                "consoleLogs": [{"timestamp": 1000.0, "type": "error", "message": "X"}],
                "networkLogs": []
            }
        }));
        let loader = RecordingLoader::new(store, Arc::new(FakeFetcher::default()));

        let loaded = loader.load("r1").await.unwrap().unwrap();
        assert_eq!(loaded.replay_events.len(), 1);
        assert_eq!(loaded.console_logs.len(), 1);
        assert!(loaded.network_logs.is_empty());
        assert_eq!(loaded.availability.console_logs, FamilySource::Inline);
        assert_eq!(loaded.availability.network_logs, FamilySource::Inline);
        assert!(loaded.availability.video);
        assert!(loaded.recording.metadata.console_logs.is_none());
    }

    #[tokio::test]
    async fn test_remote_failure_does_not_abort_other_families() {
        let store = store_with(json!({
            "id": "r2",
            "title": "Remote",
            "createdAt": "2024-03-01T10:00:00Z",
            "metadata": {
                "rrwebEventsUrl": "https://blob/events.json",
                "consoleLogsUrl": "https://blob/missing.json",
                "networkLogsUrl": "https://blob/network.json"
            }
        }));
        let mut fetcher = FakeFetcher::default();
        fetcher.documents.insert(
            "https://blob/events.json".to_string(),
            json!([{"type": 4, "timestamp": 10.0, "data": {}}, {"type": 2, "timestamp": 11.0, "data": {}}]),
        );
        fetcher.documents.insert(
            "https://blob/network.json".to_string(),
            json!({"unexpected": "shape"}),
        );
        let fetcher = Arc::new(fetcher);
        let loader = RecordingLoader::new(store, fetcher.clone());

        let loaded = loader.load("r2").await.unwrap().unwrap();
        assert_eq!(loaded.replay_events.len(), 2);
        assert_eq!(loaded.availability.replay_events, FamilySource::Remote);
        assert!(loaded.console_logs.is_empty());
        assert_eq!(loaded.availability.console_logs, FamilySource::Unavailable);
        assert!(loaded.network_logs.is_empty());
        assert_eq!(loaded.availability.network_logs, FamilySource::Unavailable);
        assert!(!loaded.availability.video);
        assert_eq!(fetcher.requested.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_inline_wins_over_url() {
        let store = store_with(json!({
            "id": "r3",
            "createdAt": "2024-03-01T10:00:00Z",
            "metadata": {
                "consoleLogs": [{"timestamp": 1.0, "type": "log", "message": "hi"}],
                "consoleLogsUrl": "https://blob/console.json"
            }
        }));
        let fetcher = Arc::new(FakeFetcher::default());
        let loader = RecordingLoader::new(store, fetcher.clone());

        let loaded = loader.load("r3").await.unwrap().unwrap();
        assert_eq!(loaded.console_logs.len(), 1);
        assert!(fetcher.requested.lock().is_empty());
    }

    #[tokio::test]
    async fn test_missing_recording() {
        let loader = RecordingLoader::new(
            Arc::new(MemoryRecordingStore::new()),
            Arc::new(FakeFetcher::default()),
        );
        assert!(loader.load("ghost").await.unwrap().is_none());
    }
}
