//! Serializable player snapshot
//!
//! Everything a renderer needs to draw the controls, scrub bar and side
//! panels without reaching into the session.

use crate::recording::loader::DataAvailability;
use crate::replay::driver::OverlayStatus;
use crate::timeline::markers::{Marker, MarkerCounts, MarkerKind};
use crate::utils::format::format_timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerView {
    pub index: usize,
    pub time_ms: f64,
    pub time_label: String,
    pub kind: MarkerKind,
    pub label: String,
    /// Left offset on the scrub bar, 0 to 100
    pub position_percent: f64,
}

impl MarkerView {
    pub fn new(index: usize, marker: &Marker, duration_ms: f64) -> Self {
        Self {
            index,
            time_ms: marker.time_ms,
            time_label: format_timestamp(marker.time_ms),
            kind: marker.kind,
            label: marker.label.clone(),
            position_percent: marker.position_fraction(duration_ms) * 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub session_id: Uuid,
    pub recording_id: String,
    pub title: String,
    pub video_url: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub resolution: Option<String>,

    pub current_time_ms: f64,
    pub duration_ms: f64,
    pub is_playing: bool,
    /// Playhead position, 0 to 100
    pub progress_percent: f64,
    /// e.g. `0:05 / 2:00`
    pub time_label: String,

    pub markers: Vec<MarkerView>,
    pub marker_counts: MarkerCounts,

    pub overlay: OverlayStatus,
    pub visible_console_count: usize,
    pub visible_network_count: usize,
    pub availability: DataAvailability,
}

/// `current / duration` label for the control bar
pub fn time_label(current_time_ms: f64, duration_ms: f64) -> String {
    format!(
        "{} / {}",
        format_timestamp(current_time_ms),
        format_timestamp(duration_ms)
    )
}
