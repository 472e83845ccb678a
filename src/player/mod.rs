//! Player composition
//!
//! Ties the timeline core, the replay overlay and the recording loader into
//! an openable view.

pub mod config;
pub mod host;
pub mod session;
pub mod view;

pub use config::PlayerConfig;
pub use host::{DepsFactory, OpenOutcome, PlayerHost};
pub use session::{PlayerSession, SessionDeps, TimeObserver};
pub use view::{MarkerView, PlayerView};
