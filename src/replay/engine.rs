//! Replay engine boundary
//!
//! The DOM replay library is an external collaborator. The player only needs
//! to create an engine over an event sequence and a mount target, move it with
//! `play`/`pause`, and destroy it.

use crate::recording::schema::ReplayEvent;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// rrweb event type of a full DOM snapshot
pub const EVENT_TYPE_FULL_SNAPSHOT: u64 = 2;

/// Replay engine errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayError {
    #[error("Not enough replay events: need at least {needed}, got {got}")]
    NotEnoughEvents { needed: usize, got: usize },

    #[error("Malformed event stream: {0}")]
    MalformedEvents(String),

    #[error("Replay engine failure: {0}")]
    Engine(String),

    #[error("Replay engine already destroyed")]
    Destroyed,
}

/// Where the overlay is rendered.
///
/// The overlay sits exactly over the video, stacked above it, and lets pointer
/// events through to the video controls underneath.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayMount {
    /// Container element id
    pub target: String,
    pub z_index: i32,
    pub pointer_events_passthrough: bool,
}

impl OverlayMount {
    pub fn over_video(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            z_index: 10,
            pointer_events_passthrough: true,
        }
    }
}

/// Options handed to the replay engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplayerConfig {
    /// Cosmetic mouse trail
    pub mouse_tail: bool,
    /// Whether the replayed DOM may take focus or pointer input
    pub interactive: bool,
    pub skip_inactive: bool,
    pub show_warning: bool,
    pub speed: f64,
}

impl Default for ReplayerConfig {
    fn default() -> Self {
        Self {
            mouse_tail: false,
            interactive: false,
            skip_inactive: false,
            show_warning: false,
            speed: 1.0,
        }
    }
}

/// A live replay engine instance
pub trait ReplayEngine: Send {
    /// Render the frame at `at_ms` and keep playing from there
    fn play(&mut self, at_ms: f64) -> Result<(), ReplayError>;

    /// Render the frame at `at_ms` and hold it
    fn pause(&mut self, at_ms: f64) -> Result<(), ReplayError>;

    fn destroy(&mut self) -> Result<(), ReplayError>;
}

/// Creates replay engines
pub trait ReplayEngineFactory: Send + Sync {
    fn create(
        &self,
        events: Arc<[ReplayEvent]>,
        mount: &OverlayMount,
        config: &ReplayerConfig,
    ) -> Result<Box<dyn ReplayEngine>, ReplayError>;
}

/// Check that an event stream can start a replay: at least two events, one of
/// them a full snapshot, timestamps finite.
pub fn validate_event_stream(events: &[ReplayEvent]) -> Result<(), ReplayError> {
    if events.len() < 2 {
        return Err(ReplayError::NotEnoughEvents {
            needed: 2,
            got: events.len(),
        });
    }
    if let Some(bad) = events.iter().position(|e| !e.timestamp.is_finite()) {
        return Err(ReplayError::MalformedEvents(format!(
            "event {} has a non-finite timestamp",
            bad
        )));
    }
    if !events.iter().any(|e| e.event_type == EVENT_TYPE_FULL_SNAPSHOT) {
        return Err(ReplayError::MalformedEvents(
            "no full snapshot event".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// Headless engine
// =============================================================================

/// Observable state of a `HeadlessReplayEngine`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessReplayState {
    pub position_ms: f64,
    pub playing: bool,
    pub destroyed: bool,
    /// Every `play`/`pause` target, in call order
    pub renders: Vec<f64>,
}

/// Engine that renders nothing and records where it was told to be.
///
/// Backs the player when no webview is attached, and lets callers inspect
/// what the overlay would have shown.
pub struct HeadlessReplayEngine {
    state: Arc<Mutex<HeadlessReplayState>>,
}

impl HeadlessReplayEngine {
    pub fn state(&self) -> Arc<Mutex<HeadlessReplayState>> {
        Arc::clone(&self.state)
    }

    fn render(&mut self, at_ms: f64, playing: bool) -> Result<(), ReplayError> {
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(ReplayError::Destroyed);
        }
        state.position_ms = at_ms;
        state.playing = playing;
        state.renders.push(at_ms);
        Ok(())
    }
}

impl ReplayEngine for HeadlessReplayEngine {
    fn play(&mut self, at_ms: f64) -> Result<(), ReplayError> {
        self.render(at_ms, true)
    }

    fn pause(&mut self, at_ms: f64) -> Result<(), ReplayError> {
        self.render(at_ms, false)
    }

    fn destroy(&mut self) -> Result<(), ReplayError> {
        let mut state = self.state.lock();
        if state.destroyed {
            return Err(ReplayError::Destroyed);
        }
        state.destroyed = true;
        state.playing = false;
        Ok(())
    }
}

/// Factory for `HeadlessReplayEngine`s that keeps a handle on each engine's state
#[derive(Default)]
pub struct HeadlessReplayFactory {
    created: Mutex<Vec<Arc<Mutex<HeadlessReplayState>>>>,
}

impl HeadlessReplayFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// States of all engines created so far, oldest first
    pub fn engines(&self) -> Vec<Arc<Mutex<HeadlessReplayState>>> {
        self.created.lock().clone()
    }
}

impl ReplayEngineFactory for HeadlessReplayFactory {
    fn create(
        &self,
        events: Arc<[ReplayEvent]>,
        mount: &OverlayMount,
        _config: &ReplayerConfig,
    ) -> Result<Box<dyn ReplayEngine>, ReplayError> {
        validate_event_stream(&events)?;

        let engine = HeadlessReplayEngine {
            state: Arc::new(Mutex::new(HeadlessReplayState::default())),
        };
        self.created.lock().push(engine.state());
        tracing::debug!(
            "Headless replay engine over {} events mounted at '{}'",
            events.len(),
            mount.target
        );
        Ok(Box::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn event(event_type: u64, timestamp: f64) -> ReplayEvent {
        ReplayEvent {
            event_type,
            data: Value::Null,
            timestamp,
            delay: None,
        }
    }

    #[test]
    fn test_validate_event_stream() {
        assert_eq!(
            validate_event_stream(&[event(2, 1.0)]),
            Err(ReplayError::NotEnoughEvents { needed: 2, got: 1 })
        );
        assert!(matches!(
            validate_event_stream(&[event(4, 1.0), event(3, 2.0)]),
            Err(ReplayError::MalformedEvents(_))
        ));
        assert!(matches!(
            validate_event_stream(&[event(4, 1.0), event(2, f64::NAN)]),
            Err(ReplayError::MalformedEvents(_))
        ));
        assert!(validate_event_stream(&[event(4, 1.0), event(2, 2.0)]).is_ok());
    }

    #[test]
    fn test_headless_engine_records_renders() {
        let factory = HeadlessReplayFactory::new();
        let events: Arc<[ReplayEvent]> = vec![event(4, 1.0), event(2, 2.0)].into();
        let mut engine = factory
            .create(events, &OverlayMount::over_video("overlay"), &ReplayerConfig::default())
            .unwrap();

        engine.pause(0.0).unwrap();
        engine.play(1500.0).unwrap();
        engine.destroy().unwrap();

        let state = factory.engines()[0].lock().clone();
        assert_eq!(state.renders, vec![0.0, 1500.0]);
        assert!(state.destroyed);
        assert!(!state.playing);

        assert_eq!(engine.destroy(), Err(ReplayError::Destroyed));
        assert_eq!(engine.play(10.0), Err(ReplayError::Destroyed));
    }

    #[test]
    fn test_default_config_is_non_interactive() {
        let config = ReplayerConfig::default();
        assert!(!config.interactive);
        assert!(!config.mouse_tail);
        assert!(OverlayMount::over_video("x").pointer_events_passthrough);
    }
}
