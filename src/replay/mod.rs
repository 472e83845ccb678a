//! DOM replay overlay
//!
//! - `engine`: the replay library boundary and a headless engine
//! - `video`: the media element boundary
//! - `driver`: keeps the overlay on the video's position

pub mod driver;
pub mod engine;
pub mod video;

pub use driver::{OverlayStatus, ReplayDriver};
pub use engine::{
    HeadlessReplayFactory, OverlayMount, ReplayEngine, ReplayEngineFactory, ReplayError,
    ReplayerConfig,
};
pub use video::{RemoteVideo, VideoCommand, VideoElement, VideoEvent, VideoSnapshot};
