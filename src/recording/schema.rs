//! Recording schema definitions
//!
//! These types match the persisted recording entity written by the capture
//! extension. All timestamps inside the metadata are absolute wall-clock
//! milliseconds.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Recording
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Playable video resource location
    #[serde(default)]
    pub url: Option<String>,
    /// Duration in seconds, when the capture knew it
    #[serde(default)]
    pub duration: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: RecordingMetadata,
}

impl Recording {
    /// Duration in milliseconds, if known and sane
    pub fn duration_ms(&self) -> Option<f64> {
        self.duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| d * 1000.0)
    }

    /// Whether there is a video resource to play
    pub fn has_video(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}

/// Loosely typed metadata bag.
///
/// Each log family may be inline, behind a URL, or absent. Families stay as raw
/// JSON here and are decoded leniently by the loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rrweb_events: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rrweb_events_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_logs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_logs_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_logs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_logs_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// Anything else the capture stored
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Log Families
// =============================================================================

/// Anything positioned on the absolute wall clock
pub trait Timestamped {
    fn timestamp(&self) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleLogEntry {
    pub timestamp: f64,
    #[serde(rename = "type")]
    pub level: ConsoleLevel,
    #[serde(default)]
    pub message: String,
}

impl Timestamped for ConsoleLogEntry {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkLogEntry {
    pub timestamp: f64,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl NetworkLogEntry {
    /// A response with an HTTP error status
    pub fn is_failure(&self) -> bool {
        self.status.is_some_and(|s| s >= 400)
    }
}

impl Timestamped for NetworkLogEntry {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

// =============================================================================
// Replay Events (rrweb)
// =============================================================================

/// rrweb top-level event type for incremental snapshots
pub const EVENT_TYPE_INCREMENTAL_SNAPSHOT: u64 = 3;

/// rrweb incremental source for mouse interactions
pub const INCREMENTAL_SOURCE_MOUSE_INTERACTION: u64 = 2;

/// rrweb mouse interaction subtype for clicks
pub const MOUSE_INTERACTION_CLICK: u64 = 2;

/// One recorded DOM mutation or interaction.
///
/// The payload is kept as raw JSON because it is handed to the replay engine
/// untouched; only the discriminators are inspected here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayEvent {
    #[serde(rename = "type")]
    pub event_type: u64,
    #[serde(default)]
    pub data: Value,
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
}

impl ReplayEvent {
    pub fn is_incremental_snapshot(&self) -> bool {
        self.event_type == EVENT_TYPE_INCREMENTAL_SNAPSHOT
    }

    /// Incremental source code (`data.source`), for incremental snapshots only
    pub fn incremental_source(&self) -> Option<u64> {
        if !self.is_incremental_snapshot() {
            return None;
        }
        self.data.get("source").and_then(Value::as_u64)
    }

    /// A click recorded as a mouse-interaction incremental snapshot
    pub fn is_click(&self) -> bool {
        self.incremental_source() == Some(INCREMENTAL_SOURCE_MOUSE_INTERACTION)
            && self.data.get("type").and_then(Value::as_u64) == Some(MOUSE_INTERACTION_CLICK)
    }
}

impl Timestamped for ReplayEvent {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

// =============================================================================
// Lenient decoding
// =============================================================================

/// Decode a log family from raw JSON.
///
/// Non-array values yield `None`. Entries that fail to decode are skipped and
/// counted in the returned tuple.
pub fn decode_family<T: DeserializeOwned>(value: &Value) -> Option<(Vec<T>, usize)> {
    let items = value.as_array()?;
    let mut skipped = 0;
    let decoded = items
        .iter()
        .filter_map(|item| match serde_json::from_value::<T>(item.clone()) {
            Ok(entry) => Some(entry),
            Err(_) => {
                skipped += 1;
                None
            }
        })
        .collect();
    Some((decoded, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recording_from_json() {
        let recording: Recording = serde_json::from_value(json!({
            "id": "rec-1",
            "title": "Checkout flow",
            "url": "https://cdn.example.com/rec-1.webm",
            "duration": 120.5,
            "createdAt": "2024-03-01T10:00:00Z",
            "metadata": {
                "browser": "Chrome 122",
                "consoleLogsUrl": "https://cdn.example.com/rec-1/console.json",
                "viewport": { "width": 1440 }
            }
        }))
        .unwrap();

        assert_eq!(recording.duration_ms(), Some(120_500.0));
        assert!(recording.has_video());
        assert_eq!(recording.metadata.browser.as_deref(), Some("Chrome 122"));
        assert!(recording.metadata.console_logs.is_none());
        assert!(recording.metadata.extra.contains_key("viewport"));
    }

    #[test]
    fn test_recording_minimal() {
        let recording: Recording = serde_json::from_value(json!({
            "id": "rec-2",
            "createdAt": "2024-03-01T10:00:00Z",
            "duration": null
        }))
        .unwrap();

        assert_eq!(recording.duration_ms(), None);
        assert!(!recording.has_video());
    }

    #[test]
    fn test_console_level_unknown_maps_to_other() {
        let entry: ConsoleLogEntry =
            serde_json::from_value(json!({"timestamp": 1.0, "type": "debug", "message": "m"}))
                .unwrap();
        assert_eq!(entry.level, ConsoleLevel::Other);
    }

    #[test]
    fn test_click_detection() {
        let click: ReplayEvent = serde_json::from_value(json!({
            "type": 3, "timestamp": 10.0, "data": {"source": 2, "type": 2, "id": 14}
        }))
        .unwrap();
        let mouse_down: ReplayEvent = serde_json::from_value(json!({
            "type": 3, "timestamp": 11.0, "data": {"source": 2, "type": 1}
        }))
        .unwrap();
        let mutation: ReplayEvent = serde_json::from_value(json!({
            "type": 3, "timestamp": 12.0, "data": {"source": 0}
        }))
        .unwrap();
        let full_snapshot: ReplayEvent = serde_json::from_value(json!({
            "type": 2, "timestamp": 13.0, "data": {"source": 2, "type": 2}
        }))
        .unwrap();

        assert!(click.is_click());
        assert!(!mouse_down.is_click());
        assert!(!mutation.is_click());
        assert!(!full_snapshot.is_click());
    }

    #[test]
    fn test_decode_family_skips_bad_entries() {
        let raw = json!([
            {"timestamp": 1.0, "method": "GET", "url": "/a", "status": 200},
            {"method": "GET"},
            {"timestamp": 3.0, "method": "POST", "url": "/b", "status": 500}
        ]);
        let (entries, skipped) = decode_family::<NetworkLogEntry>(&raw).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(skipped, 1);
        assert!(entries[1].is_failure());

        assert!(decode_family::<NetworkLogEntry>(&json!({"not": "an array"})).is_none());
    }
}
