//! Time base reconciliation
//!
//! Video time starts at zero, while replay events and logs carry absolute
//! wall-clock milliseconds. The first replay event defines the recording's
//! zero point; everything else is shifted by it.

use crate::recording::schema::{ConsoleLogEntry, NetworkLogEntry, ReplayEvent};

/// Absolute timestamp treated as time zero.
///
/// Without replay events (video-only recording) the origin is `0`, so log
/// timestamps are treated as already relative.
pub fn origin_timestamp(events: &[ReplayEvent]) -> f64 {
    match events.first() {
        Some(first) if first.timestamp.is_finite() => first.timestamp,
        _ => 0.0,
    }
}

/// Conversion between absolute timestamps and timeline positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeBase {
    pub origin: f64,
}

impl TimeBase {
    pub fn new(origin: f64) -> Self {
        Self { origin }
    }

    pub fn from_events(events: &[ReplayEvent]) -> Self {
        Self::new(origin_timestamp(events))
    }

    pub fn to_relative(&self, absolute_ms: f64) -> f64 {
        absolute_ms - self.origin
    }

    pub fn to_absolute(&self, relative_ms: f64) -> f64 {
        relative_ms + self.origin
    }

    /// Span from the origin to the latest timestamp in any family.
    ///
    /// Used as the timeline duration when neither the recording nor the video
    /// reports one.
    pub fn inferred_duration_ms(
        &self,
        events: &[ReplayEvent],
        console: &[ConsoleLogEntry],
        network: &[NetworkLogEntry],
    ) -> f64 {
        let latest = events
            .iter()
            .map(|e| e.timestamp)
            .chain(console.iter().map(|c| c.timestamp))
            .chain(network.iter().map(|n| n.timestamp + n.duration.unwrap_or(0.0)))
            .filter(|t| t.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);

        if latest.is_finite() {
            self.to_relative(latest).max(0.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::schema::ConsoleLevel;
    use serde_json::Value;

    fn event(timestamp: f64) -> ReplayEvent {
        ReplayEvent {
            event_type: 4,
            data: Value::Null,
            timestamp,
            delay: None,
        }
    }

    #[test]
    fn test_origin_is_first_event() {
        let events = [event(1_700_000_000_500.0), event(1_700_000_000_100.0)];
        assert_eq!(origin_timestamp(&events), 1_700_000_000_500.0);
    }

    #[test]
    fn test_origin_fallback_is_exactly_zero() {
        let origin = origin_timestamp(&[]);
        assert_eq!(origin, 0.0);
        assert!(!origin.is_nan());

        assert_eq!(origin_timestamp(&[event(f64::NAN)]), 0.0);
    }

    #[test]
    fn test_relative_conversion() {
        let base = TimeBase::from_events(&[event(500.0)]);
        assert_eq!(base.to_relative(1000.0), 500.0);
        assert_eq!(base.to_absolute(500.0), 1000.0);
    }

    #[test]
    fn test_inferred_duration() {
        let base = TimeBase::new(1000.0);
        let console = [ConsoleLogEntry {
            timestamp: 4000.0,
            level: ConsoleLevel::Log,
            message: String::new(),
        }];
        let network = [NetworkLogEntry {
            timestamp: 3000.0,
            method: "GET".into(),
            url: "/slow".into(),
            status: Some(200),
            duration: Some(2500.0),
        }];

        assert_eq!(
            base.inferred_duration_ms(&[event(1000.0)], &console, &network),
            4500.0
        );
        assert_eq!(base.inferred_duration_ms(&[], &[], &[]), 0.0);
    }
}
