//! Progressive log reveal
//!
//! Side panels show only the console and network entries that have already
//! "played": those with `timestamp <= origin + current_time`, inclusive.

use super::controller::{Subscription, TimelineController};
use super::origin::TimeBase;
use crate::recording::schema::{ConsoleLevel, ConsoleLogEntry, NetworkLogEntry, Timestamped};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Entries of `log` at or before the playhead.
///
/// Logs in ascending order (the normal case) are cut with a binary search and
/// the result is a prefix; anything else falls back to a linear filter.
pub fn visible<T: Timestamped>(log: &[T], current_time_ms: f64, origin: f64) -> Vec<&T> {
    let cutoff = origin + current_time_ms;

    if is_ascending(log) {
        let end = log.partition_point(|entry| entry.timestamp() <= cutoff);
        log[..end].iter().collect()
    } else {
        log.iter().filter(|entry| entry.timestamp() <= cutoff).collect()
    }
}

fn is_ascending<T: Timestamped>(log: &[T]) -> bool {
    log.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp())
}

/// Logs revealed at one playhead position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleLogs {
    pub current_time_ms: f64,
    pub console: Vec<ConsoleLogEntry>,
    pub network: Vec<NetworkLogEntry>,
}

impl VisibleLogs {
    pub fn compute(
        console: &[ConsoleLogEntry],
        network: &[NetworkLogEntry],
        current_time_ms: f64,
        time_base: TimeBase,
    ) -> Self {
        Self {
            current_time_ms,
            console: visible(console, current_time_ms, time_base.origin)
                .into_iter()
                .cloned()
                .collect(),
            network: visible(network, current_time_ms, time_base.origin)
                .into_iter()
                .cloned()
                .collect(),
        }
    }

    /// Console entries of one level, for the filtered console tab
    pub fn console_at_level(&self, level: ConsoleLevel) -> impl Iterator<Item = &ConsoleLogEntry> {
        self.console.iter().filter(move |entry| entry.level == level)
    }

    pub fn failed_requests(&self) -> impl Iterator<Item = &NetworkLogEntry> {
        self.network.iter().filter(|entry| entry.is_failure())
    }
}

/// Keeps a `VisibleLogs` snapshot in step with a timeline
pub struct LogVisibilityFilter {
    snapshot: Arc<RwLock<VisibleLogs>>,
    subscription: Option<Subscription>,
}

impl LogVisibilityFilter {
    /// Subscribe to `timeline`; the snapshot is recomputed on every time change
    pub fn attach(
        timeline: &TimelineController,
        console: Arc<[ConsoleLogEntry]>,
        network: Arc<[NetworkLogEntry]>,
        time_base: TimeBase,
    ) -> Self {
        let snapshot = Arc::new(RwLock::new(VisibleLogs::default()));

        let target = Arc::clone(&snapshot);
        let subscription = timeline.subscribe(move |time| {
            let logs = VisibleLogs::compute(&console, &network, time, time_base);
            *target.write() = logs;
        });

        Self {
            snapshot,
            subscription: Some(subscription),
        }
    }

    /// Copy of the logs visible at the latest playhead position
    pub fn snapshot(&self) -> VisibleLogs {
        self.snapshot.read().clone()
    }

    /// Stop following the timeline. The last snapshot stays readable.
    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

impl Drop for LogVisibilityFilter {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::clock::ManualClock;

    fn console(timestamp: f64) -> ConsoleLogEntry {
        ConsoleLogEntry {
            timestamp,
            level: if timestamp as u64 % 2 == 0 {
                ConsoleLevel::Log
            } else {
                ConsoleLevel::Error
            },
            message: format!("at {}", timestamp),
        }
    }

    fn request(timestamp: f64, status: u16) -> NetworkLogEntry {
        NetworkLogEntry {
            timestamp,
            method: "GET".to_string(),
            url: "/".to_string(),
            status: Some(status),
            duration: None,
        }
    }

    #[test]
    fn test_scenario_single_entry() {
        let log = [ConsoleLogEntry {
            timestamp: 1000.0,
            level: ConsoleLevel::Error,
            message: "X".to_string(),
        }];

        assert!(visible(&log, 400.0, 500.0).is_empty());
        assert_eq!(visible(&log, 600.0, 500.0).len(), 1);
    }

    #[test]
    fn test_inclusive_boundary() {
        let log = [console(1000.0)];
        assert_eq!(visible(&log, 500.0, 500.0).len(), 1);
        assert!(visible(&log, 499.0, 500.0).is_empty());
    }

    #[test]
    fn test_empty_log() {
        let log: [ConsoleLogEntry; 0] = [];
        assert!(visible(&log, 0.0, 0.0).is_empty());
        assert!(visible(&log, 1e9, 0.0).is_empty());
    }

    #[test]
    fn test_time_zero_reveals_entries_before_origin() {
        let log = [console(400.0), console(500.0), console(501.0)];
        let shown = visible(&log, 0.0, 500.0);
        assert_eq!(shown.len(), 2);
    }

    #[test]
    fn test_monotonic_prefix() {
        let log: Vec<ConsoleLogEntry> = (0..50).map(|i| console(100.0 + i as f64 * 37.0)).collect();
        let origin = 100.0;

        let mut previous: Vec<&ConsoleLogEntry> = Vec::new();
        for t in (0..2000).step_by(45) {
            let now = visible(&log, t as f64, origin);
            assert!(now.len() >= previous.len());
            assert_eq!(&now[..previous.len()], &previous[..]);
            assert_eq!(&now[..], &log.iter().collect::<Vec<_>>()[..now.len()]);
            previous = now;
        }
    }

    #[test]
    fn test_unsorted_log_falls_back_to_filter() {
        let log = [console(300.0), console(100.0), console(200.0)];
        let shown: Vec<f64> = visible(&log, 150.0, 0.0).iter().map(|e| e.timestamp).collect();
        assert_eq!(shown, vec![100.0]);
    }

    #[test]
    fn test_filter_follows_timeline() {
        let clock = Arc::new(ManualClock::new());
        let timeline = TimelineController::new(10_000.0, clock);
        let console_logs: Arc<[ConsoleLogEntry]> =
            vec![console(1_000.0), console(2_001.0), console(5_000.0)].into();
        let network_logs: Arc<[NetworkLogEntry]> =
            vec![request(1_500.0, 200), request(3_000.0, 500)].into();

        let mut filter = LogVisibilityFilter::attach(
            &timeline,
            console_logs,
            network_logs,
            TimeBase::new(1_000.0),
        );

        let initial = filter.snapshot();
        assert_eq!(initial.console.len(), 1);
        assert!(initial.network.is_empty());

        timeline.seek(2_000.0);
        let snapshot = filter.snapshot();
        assert_eq!(snapshot.current_time_ms, 2_000.0);
        assert_eq!(snapshot.console.len(), 2);
        assert_eq!(snapshot.network.len(), 2);
        assert_eq!(snapshot.failed_requests().count(), 1);
        assert_eq!(snapshot.console_at_level(ConsoleLevel::Error).count(), 1);

        timeline.seek(100.0);
        assert_eq!(filter.snapshot().console.len(), 1);

        filter.detach();
        assert_eq!(timeline.subscriber_count(), 0);
        timeline.seek(9_000.0);
        assert_eq!(filter.snapshot().current_time_ms, 100.0);
    }

    #[test]
    fn test_filter_follows_seek_made_by_another_subscriber() {
        let timeline = TimelineController::new(10_000.0, Arc::new(ManualClock::new()));
        let handle = timeline.clone();
        let _redirect = timeline.subscribe(move |t| {
            if t == 100.0 {
                handle.seek(200.0);
            }
        });
        let filter = LogVisibilityFilter::attach(
            &timeline,
            vec![console(150.0)].into(),
            Vec::<NetworkLogEntry>::new().into(),
            TimeBase::new(0.0),
        );

        timeline.seek(100.0);

        let snapshot = filter.snapshot();
        assert_eq!(timeline.current_time(), 200.0);
        assert_eq!(snapshot.current_time_ms, 200.0);
        assert_eq!(snapshot.console.len(), 1);
    }
}
