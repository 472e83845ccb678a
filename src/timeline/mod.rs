//! Timeline core
//!
//! Pure pieces of the player, in dependency order:
//! - `controller`: playhead state machine driven by a `clock::FrameClock`
//! - `origin`: the shared zero point for video, replay and log timestamps
//! - `markers`: scrub-bar annotations derived once per recording
//! - `visibility`: logs revealed up to the playhead

pub mod clock;
pub mod controller;
pub mod markers;
pub mod origin;
pub mod visibility;

pub use clock::{ExternalClock, FrameClock, ManualClock, TokioFrameClock};
pub use controller::{Subscription, TimelineController, TimelineState};
pub use markers::{aggregate_markers, Marker, MarkerKind};
pub use origin::{origin_timestamp, TimeBase};
pub use visibility::{visible, LogVisibilityFilter, VisibleLogs};
