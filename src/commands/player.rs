//! Player Tauri commands
//!
//! These commands open recordings and forward user actions and native video
//! notifications from the webview into the player.

use super::webview::{webview_video, WebviewReplayFactory, TIMELINE_UPDATE_EVENT};
use crate::player::{OpenOutcome, PlayerConfig, PlayerHost, PlayerView, SessionDeps, TimeObserver};
use crate::recording::fetch::HttpLogFetcher;
use crate::recording::loader::{LoadedRecording, RecordingLoader};
use crate::recording::store::BundleRecordingStore;
use crate::replay::engine::OverlayMount;
use crate::replay::video::{RemoteVideo, VideoElement, VideoEvent, VideoSnapshot};
use crate::timeline::clock::{ExternalClock, FrameClock, TokioFrameClock};
use crate::timeline::visibility::VisibleLogs;
use crate::utils::error::{AppError, ErrorResponse};
use std::sync::Arc;
use tauri::{AppHandle, Emitter, Manager, State};

/// Application state for the player
pub struct PlayerState {
    pub host: Arc<PlayerHost>,
    /// Mirror of the webview's `<video>`, shared by every session
    pub video: Arc<RemoteVideo>,
}

impl PlayerState {
    /// Build the player from the app's data and config directories
    pub fn initialize(app: &AppHandle) -> anyhow::Result<Self> {
        let recordings_dir = app.path().app_data_dir()?.join("recordings");
        let config_path = app.path().app_config_dir()?.join("player.json");
        let config = PlayerConfig::load_or_default(&config_path)?;

        tracing::info!("Recordings directory: {:?}", recordings_dir);

        let loader = RecordingLoader::new(
            Arc::new(BundleRecordingStore::new(recordings_dir)),
            Arc::new(HttpLogFetcher::new(config.fetch_timeout())?),
        );

        let video = Arc::new(webview_video(app.clone()));
        let replay_factory = Arc::new(WebviewReplayFactory::new(app.clone()));
        let mount = OverlayMount::over_video(config.overlay_target.clone());
        let frame_interval = config.frame_interval();

        let deps_video = Arc::clone(&video);
        let deps_app = app.clone();
        let deps = Arc::new(move |loaded: &LoadedRecording| {
            let video_bound = loaded.availability.video;
            let clock: Arc<dyn FrameClock> = if video_bound {
                Arc::new(ExternalClock::new())
            } else {
                match TokioFrameClock::from_current(frame_interval) {
                    Some(clock) => Arc::new(clock),
                    None => {
                        tracing::warn!("No tokio runtime for the frame clock, playback is manual");
                        Arc::new(ExternalClock::new())
                    }
                }
            };

            SessionDeps {
                clock,
                replay_factory: replay_factory.clone(),
                video: video_bound.then(|| deps_video.clone() as Arc<dyn VideoElement>),
                mount: Some(mount.clone()),
                observer: Some(timeline_emitter(deps_app.clone())),
            }
        });

        Ok(Self {
            host: Arc::new(PlayerHost::new(loader, config, deps)),
            video,
        })
    }
}

/// Forwards every playhead change to the webview
fn timeline_emitter(app: AppHandle) -> TimeObserver {
    Arc::new(move |time_ms: f64| {
        if let Err(e) = app.emit(TIMELINE_UPDATE_EVENT, time_ms) {
            tracing::warn!("Failed to emit timeline update: {}", e);
        }
    })
}

/// Open a recording, replacing the current one
#[tauri::command]
pub async fn open_recording(
    id: String,
    state: State<'_, PlayerState>,
) -> Result<OpenOutcome, ErrorResponse> {
    Ok(state.host.open(&id).await?)
}

/// Close the current recording
#[tauri::command]
pub async fn close_recording(state: State<'_, PlayerState>) -> Result<(), ErrorResponse> {
    state.host.close();
    Ok(())
}

#[tauri::command]
pub async fn player_play(state: State<'_, PlayerState>) -> Result<PlayerView, ErrorResponse> {
    Ok(state.host.with_session(|session| {
        session.play();
        session.view()
    })?)
}

#[tauri::command]
pub async fn player_pause(state: State<'_, PlayerState>) -> Result<PlayerView, ErrorResponse> {
    Ok(state.host.with_session(|session| {
        session.pause();
        session.view()
    })?)
}

#[tauri::command]
pub async fn player_seek(
    time_ms: f64,
    state: State<'_, PlayerState>,
) -> Result<PlayerView, ErrorResponse> {
    Ok(state.host.with_session(|session| {
        session.seek(time_ms);
        session.view()
    })?)
}

#[tauri::command]
pub async fn player_restart(state: State<'_, PlayerState>) -> Result<PlayerView, ErrorResponse> {
    Ok(state.host.with_session(|session| {
        session.restart();
        session.view()
    })?)
}

/// Jump to a marker from the marker list or scrub bar
#[tauri::command]
pub async fn player_seek_to_marker(
    index: usize,
    state: State<'_, PlayerState>,
) -> Result<PlayerView, ErrorResponse> {
    let view = state.host.with_session(|session| {
        session.seek_to_marker(index)?;
        Ok::<_, AppError>(session.view())
    })??;
    Ok(view)
}

/// Step to the next (`forward`) or previous marker
#[tauri::command]
pub async fn player_step_marker(
    forward: bool,
    state: State<'_, PlayerState>,
) -> Result<PlayerView, ErrorResponse> {
    Ok(state.host.with_session(|session| {
        let target = if forward {
            session.seek_to_next_marker()
        } else {
            session.seek_to_previous_marker()
        };
        if target.is_none() {
            tracing::debug!("No marker to step to (forward: {})", forward);
        }
        session.view()
    })?)
}

/// Forward a native `<video>` event together with the element's state
#[tauri::command]
pub async fn report_video_event(
    event: VideoEvent,
    snapshot: VideoSnapshot,
    state: State<'_, PlayerState>,
) -> Result<PlayerView, ErrorResponse> {
    state.video.report(snapshot);
    Ok(state.host.with_session(|session| {
        session.handle_video_event(event);
        session.view()
    })?)
}

#[tauri::command]
pub async fn get_player_view(state: State<'_, PlayerState>) -> Result<PlayerView, ErrorResponse> {
    Ok(state.host.view()?)
}

/// Console and network entries revealed at the playhead
#[tauri::command]
pub async fn get_visible_logs(state: State<'_, PlayerState>) -> Result<VisibleLogs, ErrorResponse> {
    Ok(state.host.with_session(|session| session.visible_logs())?)
}
