//! Player session
//!
//! One open recording view: wires the time base, markers, timeline, log
//! filter and replay overlay together and routes user actions and video
//! notifications through them.
//!
//! With a video bound, the video is the clock. User actions are sent to the
//! video, and its notifications move the timeline via `seek`. Without a video
//! the timeline runs on its own frame clock.

use super::config::PlayerConfig;
use super::view::{time_label, MarkerView, PlayerView};
use crate::recording::loader::{DataAvailability, LoadedRecording};
use crate::recording::schema::Recording;
use crate::replay::driver::{video_time_ms, OverlayStatus, ReplayDriver};
use crate::replay::engine::{OverlayMount, ReplayEngineFactory};
use crate::replay::video::{VideoElement, VideoEvent};
use crate::timeline::clock::{ExternalClock, FrameClock};
use crate::timeline::controller::{clamp_time, Subscription, TimelineController, TimelineState};
use crate::timeline::markers::{aggregate_markers, count_markers, next_marker, previous_marker, Marker};
use crate::timeline::origin::TimeBase;
use crate::timeline::visibility::{LogVisibilityFilter, VisibleLogs};
use crate::utils::error::{AppError, AppResult};
use std::sync::Arc;
use uuid::Uuid;

/// Playhead observer installed for the lifetime of a session
pub type TimeObserver = Arc<dyn Fn(f64) + Send + Sync>;

/// Collaborators a session is built with
pub struct SessionDeps {
    /// Frame clock for headless playback; ignored while a video is bound
    pub clock: Arc<dyn FrameClock>,
    pub replay_factory: Arc<dyn ReplayEngineFactory>,
    pub video: Option<Arc<dyn VideoElement>>,
    /// Overlay container; no overlay is created without one
    pub mount: Option<OverlayMount>,
    /// Subscribed before the session is handed out; released by teardown
    pub observer: Option<TimeObserver>,
}

pub struct PlayerSession {
    id: Uuid,
    loaded: LoadedRecording,
    time_base: TimeBase,
    markers: Arc<[Marker]>,
    timeline: TimelineController,
    logs: LogVisibilityFilter,
    driver: ReplayDriver,
    video: Option<Arc<dyn VideoElement>>,
    torn_down: bool,
}

impl PlayerSession {
    pub fn open(loaded: LoadedRecording, deps: SessionDeps, config: &PlayerConfig) -> Self {
        let time_base = TimeBase::from_events(&loaded.replay_events);

        let duration_ms = loaded.recording.duration_ms().unwrap_or_else(|| {
            time_base.inferred_duration_ms(
                &loaded.replay_events,
                &loaded.console_logs,
                &loaded.network_logs,
            )
        });

        let markers: Arc<[Marker]> = aggregate_markers(
            &loaded.console_logs,
            &loaded.network_logs,
            &loaded.replay_events,
            time_base,
        )
        .into();

        let clock: Arc<dyn FrameClock> = if deps.video.is_some() {
            Arc::new(ExternalClock::new())
        } else {
            deps.clock
        };
        let timeline = TimelineController::with_frame_step(duration_ms, clock, config.frame_step_ms);

        let logs = LogVisibilityFilter::attach(
            &timeline,
            Arc::clone(&loaded.console_logs),
            Arc::clone(&loaded.network_logs),
            time_base,
        );

        if let Some(observer) = deps.observer {
            timeline.subscribe(move |time| observer(time));
        }

        let mut driver = ReplayDriver::new(deps.replay_factory, config.replayer.clone());
        if let Some(mount) = deps.mount {
            driver.attach(Arc::clone(&loaded.replay_events), mount);
        }

        let id = Uuid::new_v4();
        tracing::info!(
            "Opened session {} for recording {}: {}ms, {} markers, origin {}",
            id,
            loaded.recording.id,
            duration_ms,
            markers.len(),
            time_base.origin
        );

        Self {
            id,
            loaded,
            time_base,
            markers,
            timeline,
            logs,
            driver,
            video: deps.video,
            torn_down: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn recording(&self) -> &Recording {
        &self.loaded.recording
    }

    pub fn availability(&self) -> DataAvailability {
        self.loaded.availability
    }

    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    pub fn timeline(&self) -> &TimelineController {
        &self.timeline
    }

    pub fn state(&self) -> TimelineState {
        self.timeline.state()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn overlay_status(&self) -> &OverlayStatus {
        self.driver.status()
    }

    /// Logs revealed at the current playhead
    pub fn visible_logs(&self) -> VisibleLogs {
        self.logs.snapshot()
    }

    /// Observe playhead changes
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.timeline.subscribe(callback)
    }

    pub fn play(&self) {
        match &self.video {
            Some(video) => video.play(),
            None => self.timeline.play(),
        }
    }

    pub fn pause(&self) {
        match &self.video {
            Some(video) => video.pause(),
            None => self.timeline.pause(),
        }
    }

    pub fn seek(&self, time_ms: f64) {
        match &self.video {
            Some(video) => {
                let target = clamp_time(time_ms, self.timeline.duration());
                video.seek(target / 1000.0);
            }
            None => self.timeline.seek(time_ms),
        }
    }

    pub fn restart(&self) {
        match &self.video {
            Some(video) => {
                video.pause();
                video.seek(0.0);
            }
            None => self.timeline.restart(),
        }
    }

    /// Jump to a marker; returns the marker's time
    pub fn seek_to_marker(&self, index: usize) -> AppResult<f64> {
        let marker = self
            .markers
            .get(index)
            .ok_or(AppError::MarkerOutOfRange(index))?;
        self.seek(marker.time_ms);
        Ok(marker.time_ms)
    }

    /// Jump to the first marker after the playhead, if any
    pub fn seek_to_next_marker(&self) -> Option<f64> {
        let time_ms = next_marker(&self.markers, self.timeline.current_time())?.time_ms;
        self.seek(time_ms);
        Some(time_ms)
    }

    /// Jump to the last marker before the playhead, if any
    pub fn seek_to_previous_marker(&self) -> Option<f64> {
        let time_ms = previous_marker(&self.markers, self.timeline.current_time())?.time_ms;
        self.seek(time_ms);
        Some(time_ms)
    }

    /// React to a native notification from the bound video
    pub fn handle_video_event(&mut self, event: VideoEvent) {
        if self.torn_down {
            return;
        }
        let Some(video) = self.video.clone() else {
            tracing::debug!("Ignoring {:?}: no video bound", event);
            return;
        };

        self.driver.on_video_event(event, video.as_ref());

        let at_ms = video_time_ms(video.as_ref());
        match event {
            VideoEvent::LoadedMetadata => {
                if let Some(secs) = video.duration_secs().filter(|d| d.is_finite() && *d > 0.0) {
                    self.timeline.set_duration(secs * 1000.0);
                }
            }
            VideoEvent::TimeUpdate | VideoEvent::Seeked => self.timeline.seek(at_ms),
            VideoEvent::Play => {
                self.timeline.seek(at_ms);
                self.timeline.play();
            }
            VideoEvent::Pause | VideoEvent::Ended => {
                self.timeline.pause();
                self.timeline.seek(at_ms);
            }
        }
    }

    pub fn view(&self) -> PlayerView {
        let state = self.timeline.state();
        let visible = self.logs.snapshot();
        let recording = &self.loaded.recording;

        PlayerView {
            session_id: self.id,
            recording_id: recording.id.clone(),
            title: recording.title.clone(),
            video_url: recording.url.clone(),
            browser: recording.metadata.browser.clone(),
            os: recording.metadata.os.clone(),
            resolution: recording.metadata.resolution.clone(),
            current_time_ms: state.current_time_ms,
            duration_ms: state.duration_ms,
            is_playing: state.is_playing,
            progress_percent: self.timeline.progress() * 100.0,
            time_label: time_label(state.current_time_ms, state.duration_ms),
            markers: self
                .markers
                .iter()
                .enumerate()
                .map(|(i, m)| MarkerView::new(i, m, state.duration_ms))
                .collect(),
            marker_counts: count_markers(&self.markers),
            overlay: self.driver.status().clone(),
            visible_console_count: visible.console.len(),
            visible_network_count: visible.network.len(),
            availability: self.loaded.availability,
        }
    }

    /// Stop playback, destroy the overlay and release subscriptions.
    /// Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        if let Some(video) = &self.video {
            video.pause();
        }
        self.timeline.pause();
        self.driver.teardown();
        self.logs.detach();
        self.timeline.destroy();

        tracing::info!("Closed session {} for recording {}", self.id, self.loaded.recording.id);
    }
}

impl Drop for PlayerSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
