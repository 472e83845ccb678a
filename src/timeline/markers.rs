//! Scrub-bar markers
//!
//! Notable moments derived from the logs and replay events: console errors,
//! failed requests and clicks. Markers are computed once per loaded recording
//! and never mutated.

use super::origin::TimeBase;
use crate::recording::schema::{ConsoleLevel, ConsoleLogEntry, NetworkLogEntry, ReplayEvent};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerKind {
    Error,
    NetworkFailure,
    Interaction,
}

/// A timeline annotation, positioned relative to the recording origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub time_ms: f64,
    pub kind: MarkerKind,
    pub label: String,
}

impl Marker {
    /// Position on a scrub bar as a fraction of `duration_ms`, clamped to `0..=1`
    pub fn position_fraction(&self, duration_ms: f64) -> f64 {
        if duration_ms.is_nan() || duration_ms <= 0.0 || !self.time_ms.is_finite() {
            return 0.0;
        }
        (self.time_ms / duration_ms).clamp(0.0, 1.0)
    }
}

/// Build the sorted marker list.
///
/// Console errors, then failed requests, then clicks are concatenated and
/// stably sorted by time, so simultaneous markers keep that order.
pub fn aggregate_markers(
    console: &[ConsoleLogEntry],
    network: &[NetworkLogEntry],
    events: &[ReplayEvent],
    time_base: TimeBase,
) -> Vec<Marker> {
    let errors = console
        .iter()
        .filter(|entry| entry.level == ConsoleLevel::Error)
        .map(|entry| Marker {
            time_ms: time_base.to_relative(entry.timestamp),
            kind: MarkerKind::Error,
            label: entry.message.clone(),
        });

    let failures = network
        .iter()
        .filter(|entry| entry.is_failure())
        .map(|entry| Marker {
            time_ms: time_base.to_relative(entry.timestamp),
            kind: MarkerKind::NetworkFailure,
            label: format!(
                "{} {} → {}",
                entry.method,
                entry.url,
                entry.status.unwrap_or_default()
            ),
        });

    let clicks = events.iter().filter(|e| e.is_click()).map(|e| Marker {
        time_ms: time_base.to_relative(e.timestamp),
        kind: MarkerKind::Interaction,
        label: "Click".to_string(),
    });

    let mut markers: Vec<Marker> = errors.chain(failures).chain(clicks).collect();
    // sort_by is stable; total_cmp keeps NaN from breaking the ordering.
    markers.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));
    markers
}

/// Per-kind totals for a marker list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerCounts {
    pub errors: usize,
    pub network_failures: usize,
    pub interactions: usize,
}

pub fn count_markers(markers: &[Marker]) -> MarkerCounts {
    markers.iter().fold(MarkerCounts::default(), |mut counts, m| {
        match m.kind {
            MarkerKind::Error => counts.errors += 1,
            MarkerKind::NetworkFailure => counts.network_failures += 1,
            MarkerKind::Interaction => counts.interactions += 1,
        }
        counts
    })
}

/// First marker strictly after `time_ms`
pub fn next_marker(markers: &[Marker], time_ms: f64) -> Option<&Marker> {
    let idx = markers.partition_point(|m| m.time_ms <= time_ms);
    markers.get(idx)
}

/// Last marker strictly before `time_ms`
pub fn previous_marker(markers: &[Marker], time_ms: f64) -> Option<&Marker> {
    let idx = markers.partition_point(|m| m.time_ms < time_ms);
    idx.checked_sub(1).and_then(|i| markers.get(i))
}
