//! Replay driver
//!
//! Owns the DOM replay overlay for one recording and keeps it on the video's
//! position. Sync is pull-based: on every native video notification the driver
//! reads the video position and tells the engine to render that exact frame.
//! The overlay follows the video and never leads it.
//!
//! Engine failures only disable the overlay; the video keeps playing.

use super::engine::{OverlayMount, ReplayEngine, ReplayEngineFactory, ReplayError, ReplayerConfig};
use super::video::{VideoElement, VideoEvent};
use crate::recording::schema::ReplayEvent;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// State of the replay overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum OverlayStatus {
    /// No engine attached
    Detached,
    /// Engine running over the video
    Active,
    /// Overlay cannot be shown; video playback is unaffected
    Unavailable { reason: String },
}

pub struct ReplayDriver {
    factory: Arc<dyn ReplayEngineFactory>,
    config: ReplayerConfig,
    engine: Option<Box<dyn ReplayEngine>>,
    events: Option<Arc<[ReplayEvent]>>,
    mount: Option<OverlayMount>,
    status: OverlayStatus,
}

impl ReplayDriver {
    pub fn new(factory: Arc<dyn ReplayEngineFactory>, config: ReplayerConfig) -> Self {
        Self {
            factory,
            config,
            engine: None,
            events: None,
            mount: None,
            status: OverlayStatus::Detached,
        }
    }

    pub fn status(&self) -> &OverlayStatus {
        &self.status
    }

    pub fn is_active(&self) -> bool {
        self.engine.is_some()
    }

    /// Start an engine over `events` at `mount`.
    ///
    /// Re-attaching the same event sequence to the same mount is a no-op. Any
    /// other sequence replaces the current engine, which is destroyed first.
    pub fn attach(&mut self, events: Arc<[ReplayEvent]>, mount: OverlayMount) -> &OverlayStatus {
        let same_events = self
            .events
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &events));
        if same_events
            && self.mount.as_ref() == Some(&mount)
            && self.status != OverlayStatus::Detached
        {
            return &self.status;
        }

        self.teardown();

        self.events = Some(Arc::clone(&events));
        self.mount = Some(mount.clone());

        if events.is_empty() {
            tracing::info!("No replay events, overlay disabled");
            self.status = OverlayStatus::Unavailable {
                reason: "no replay events".to_string(),
            };
            return &self.status;
        }

        let factory = &self.factory;
        let config = &self.config;
        let created = catch_unwind(AssertUnwindSafe(|| {
            factory.create(Arc::clone(&events), &mount, config)
        }));

        self.status = match created {
            Ok(Ok(engine)) => {
                self.engine = Some(engine);
                tracing::info!(
                    "Replay overlay attached to '{}' with {} events",
                    mount.target,
                    events.len()
                );
                OverlayStatus::Active
            }
            Ok(Err(e)) => {
                tracing::warn!("Replay overlay unavailable: {}", e);
                OverlayStatus::Unavailable {
                    reason: e.to_string(),
                }
            }
            Err(panic) => {
                let reason = format!("replay engine panicked: {}", panic_message(panic.as_ref()));
                tracing::error!("{}", reason);
                OverlayStatus::Unavailable { reason }
            }
        };
        &self.status
    }

    /// Mirror a native video notification into the engine
    pub fn on_video_event(&mut self, event: VideoEvent, video: &dyn VideoElement) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        let at_ms = video_time_ms(video);
        let result = match event {
            VideoEvent::TimeUpdate | VideoEvent::Seeked => {
                // Re-anchoring on every tick keeps drift from accumulating.
                if video.is_paused() {
                    engine.pause(at_ms)
                } else {
                    engine.play(at_ms)
                }
            }
            VideoEvent::Play => engine.play(at_ms),
            VideoEvent::Pause | VideoEvent::Ended | VideoEvent::LoadedMetadata => engine.pause(at_ms),
        };

        if let Err(e) = result {
            self.disable(e);
        }
    }

    /// Destroy the engine, if any. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if let Some(engine) = self.engine.take() {
            destroy_engine(engine);
            tracing::debug!("Replay overlay torn down");
        }
        self.events = None;
        self.mount = None;
        self.status = OverlayStatus::Detached;
    }

    fn disable(&mut self, error: ReplayError) {
        tracing::warn!("Replay engine failed, disabling overlay: {}", error);
        if let Some(engine) = self.engine.take() {
            destroy_engine(engine);
        }
        self.status = OverlayStatus::Unavailable {
            reason: error.to_string(),
        };
    }
}

impl Drop for ReplayDriver {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn destroy_engine(mut engine: Box<dyn ReplayEngine>) {
    match catch_unwind(AssertUnwindSafe(|| engine.destroy())) {
        Ok(Ok(())) => {}
        Ok(Err(ReplayError::Destroyed)) => {
            tracing::debug!("Replay engine was already destroyed");
        }
        Ok(Err(e)) => tracing::warn!("Replay engine destroy failed: {}", e),
        Err(panic) => tracing::warn!(
            "Replay engine panicked during destroy: {}",
            panic_message(panic.as_ref())
        ),
    }
}

/// Video position in replay milliseconds
pub fn video_time_ms(video: &dyn VideoElement) -> f64 {
    let secs = video.current_time_secs();
    if secs.is_finite() && secs > 0.0 {
        secs * 1000.0
    } else {
        0.0
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
