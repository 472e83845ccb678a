//! Video playback boundary
//!
//! Any media element that can report its position, seek, start and stop, and
//! emit the events below can drive the player.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Native media notifications the player reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoEvent {
    LoadedMetadata,
    TimeUpdate,
    Seeked,
    Play,
    Pause,
    Ended,
}

/// A media element. The video is the source of truth for time while bound.
pub trait VideoElement: Send + Sync {
    fn current_time_secs(&self) -> f64;

    /// Duration in seconds, once known
    fn duration_secs(&self) -> Option<f64>;

    fn is_paused(&self) -> bool;

    fn seek(&self, secs: f64);

    fn play(&self);

    fn pause(&self);
}

/// Commands sent to a video that lives elsewhere (e.g. in a webview)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VideoCommand {
    Seek { secs: f64 },
    Play,
    Pause,
}

/// Position report accompanying every forwarded video event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnapshot {
    pub current_time_secs: f64,
    pub duration_secs: Option<f64>,
    pub paused: bool,
}

impl Default for VideoSnapshot {
    fn default() -> Self {
        Self {
            current_time_secs: 0.0,
            duration_secs: None,
            paused: true,
        }
    }
}

/// `VideoElement` mirrored from reports sent by the real element.
///
/// Reads return the latest report; control calls are forwarded through the
/// command sink and take effect when the element reports back.
pub struct RemoteVideo {
    snapshot: Mutex<VideoSnapshot>,
    sink: Box<dyn Fn(VideoCommand) + Send + Sync>,
}

impl RemoteVideo {
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(VideoCommand) + Send + Sync + 'static,
    {
        Self {
            snapshot: Mutex::new(VideoSnapshot::default()),
            sink: Box::new(sink),
        }
    }

    /// Record the element's latest state
    pub fn report(&self, snapshot: VideoSnapshot) {
        *self.snapshot.lock() = snapshot;
    }

    pub fn snapshot(&self) -> VideoSnapshot {
        *self.snapshot.lock()
    }
}

impl VideoElement for RemoteVideo {
    fn current_time_secs(&self) -> f64 {
        self.snapshot.lock().current_time_secs
    }

    fn duration_secs(&self) -> Option<f64> {
        self.snapshot.lock().duration_secs
    }

    fn is_paused(&self) -> bool {
        self.snapshot.lock().paused
    }

    fn seek(&self, secs: f64) {
        (self.sink)(VideoCommand::Seek { secs });
    }

    fn play(&self) {
        (self.sink)(VideoCommand::Play);
    }

    fn pause(&self) {
        (self.sink)(VideoCommand::Pause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_video_event_names() {
        let event: VideoEvent = serde_json::from_str("\"timeupdate\"").unwrap();
        assert_eq!(event, VideoEvent::TimeUpdate);
        let event: VideoEvent = serde_json::from_str("\"loadedmetadata\"").unwrap();
        assert_eq!(event, VideoEvent::LoadedMetadata);
    }

    #[test]
    fn test_remote_video_forwards_commands() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = sent.clone();
        let video = RemoteVideo::new(move |cmd| sink.lock().push(cmd));

        assert!(video.is_paused());
        video.seek(12.5);
        video.play();
        video.report(VideoSnapshot {
            current_time_secs: 12.5,
            duration_secs: Some(60.0),
            paused: false,
        });

        assert_eq!(
            *sent.lock(),
            vec![VideoCommand::Seek { secs: 12.5 }, VideoCommand::Play]
        );
        assert_eq!(video.current_time_secs(), 12.5);
        assert_eq!(video.duration_secs(), Some(60.0));
        assert!(!video.is_paused());
    }
}
