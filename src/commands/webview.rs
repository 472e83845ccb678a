//! Webview bridge
//!
//! The `<video>` element and the rrweb replayer live in the webview. These
//! adapters implement the player's boundaries by emitting events the frontend
//! acts on; the frontend reports back through `report_video_event`.

use crate::recording::schema::ReplayEvent;
use crate::replay::engine::{
    validate_event_stream, OverlayMount, ReplayEngine, ReplayEngineFactory, ReplayError,
    ReplayerConfig,
};
use crate::replay::video::{RemoteVideo, VideoCommand};
use serde::Serialize;
use std::sync::Arc;
use tauri::{AppHandle, Emitter};
use uuid::Uuid;

/// Event carrying `ReplayCommand`s
pub const REPLAY_COMMAND_EVENT: &str = "replay-command";
/// Event carrying `VideoCommand`s
pub const VIDEO_COMMAND_EVENT: &str = "video-command";
/// Event carrying the playhead position in milliseconds
pub const TIMELINE_UPDATE_EVENT: &str = "timeline-update";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum ReplayCommand<'a> {
    Create {
        engine_id: Uuid,
        events: &'a [ReplayEvent],
        mount: &'a OverlayMount,
        config: &'a ReplayerConfig,
    },
    Play {
        engine_id: Uuid,
        at_ms: f64,
    },
    Pause {
        engine_id: Uuid,
        at_ms: f64,
    },
    Destroy {
        engine_id: Uuid,
    },
}

/// Creates replayers inside the webview
pub struct WebviewReplayFactory {
    app: AppHandle,
}

impl WebviewReplayFactory {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl ReplayEngineFactory for WebviewReplayFactory {
    fn create(
        &self,
        events: Arc<[ReplayEvent]>,
        mount: &OverlayMount,
        config: &ReplayerConfig,
    ) -> Result<Box<dyn ReplayEngine>, ReplayError> {
        validate_event_stream(&events)?;

        let engine_id = Uuid::new_v4();
        emit(
            &self.app,
            ReplayCommand::Create {
                engine_id,
                events: &events,
                mount,
                config,
            },
        )?;

        tracing::debug!("Webview replayer {} created", engine_id);
        Ok(Box::new(WebviewReplayEngine {
            app: self.app.clone(),
            engine_id,
            destroyed: false,
        }))
    }
}

struct WebviewReplayEngine {
    app: AppHandle,
    engine_id: Uuid,
    destroyed: bool,
}

impl ReplayEngine for WebviewReplayEngine {
    fn play(&mut self, at_ms: f64) -> Result<(), ReplayError> {
        if self.destroyed {
            return Err(ReplayError::Destroyed);
        }
        emit(
            &self.app,
            ReplayCommand::Play {
                engine_id: self.engine_id,
                at_ms,
            },
        )
    }

    fn pause(&mut self, at_ms: f64) -> Result<(), ReplayError> {
        if self.destroyed {
            return Err(ReplayError::Destroyed);
        }
        emit(
            &self.app,
            ReplayCommand::Pause {
                engine_id: self.engine_id,
                at_ms,
            },
        )
    }

    fn destroy(&mut self) -> Result<(), ReplayError> {
        if self.destroyed {
            return Err(ReplayError::Destroyed);
        }
        self.destroyed = true;
        emit(
            &self.app,
            ReplayCommand::Destroy {
                engine_id: self.engine_id,
            },
        )
    }
}

fn emit(app: &AppHandle, command: ReplayCommand<'_>) -> Result<(), ReplayError> {
    app.emit(REPLAY_COMMAND_EVENT, command)
        .map_err(|e| ReplayError::Engine(format!("Failed to reach webview: {}", e)))
}

/// `RemoteVideo` whose commands are emitted to the webview
pub fn webview_video(app: AppHandle) -> RemoteVideo {
    RemoteVideo::new(move |command: VideoCommand| {
        if let Err(e) = app.emit(VIDEO_COMMAND_EVENT, command) {
            tracing::warn!("Failed to send {:?} to video: {}", command, e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_replay_commands_match_frontend_handler() {
        let engine_id = Uuid::new_v4();
        let mount = OverlayMount::over_video("replay-overlay");
        let config = ReplayerConfig::default();

        let create = serde_json::to_value(ReplayCommand::Create {
            engine_id,
            events: &[],
            mount: &mount,
            config: &config,
        })
        .unwrap();
        assert_eq!(create["type"], "create");
        assert_eq!(create["engineId"], json!(engine_id));
        assert_eq!(
            create["mount"],
            json!({"target": "replay-overlay", "zIndex": 10, "pointerEventsPassthrough": true})
        );
        assert_eq!(create["config"]["interactive"], false);

        let play = serde_json::to_value(ReplayCommand::Play {
            engine_id,
            at_ms: 2000.0,
        })
        .unwrap();
        assert_eq!(play, json!({"type": "play", "engineId": engine_id, "atMs": 2000.0}));

        let destroy = serde_json::to_value(ReplayCommand::Destroy { engine_id }).unwrap();
        assert_eq!(destroy, json!({"type": "destroy", "engineId": engine_id}));
    }
}
