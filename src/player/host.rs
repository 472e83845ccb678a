//! Player host
//!
//! Holds at most one open session. Opening a recording replaces the current
//! session; if another open or a close happens while a load is in flight, the
//! late result is discarded instead of being shown.

use super::config::PlayerConfig;
use super::session::{PlayerSession, SessionDeps};
use super::view::PlayerView;
use crate::recording::loader::{LoadedRecording, RecordingLoader};
use crate::utils::error::{AppError, AppResult};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Builds fresh collaborators for each session from the loaded recording
pub type DepsFactory = Arc<dyn Fn(&LoadedRecording) -> SessionDeps + Send + Sync>;

/// Result of `PlayerHost::open`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", content = "view", rename_all = "camelCase")]
pub enum OpenOutcome {
    Opened(PlayerView),
    NotFound,
    /// A newer open or a close arrived before this load finished
    Superseded,
}

pub struct PlayerHost {
    loader: RecordingLoader,
    config: PlayerConfig,
    deps: DepsFactory,
    session: Mutex<Option<PlayerSession>>,
    generation: AtomicU64,
}

impl PlayerHost {
    pub fn new(loader: RecordingLoader, config: PlayerConfig, deps: DepsFactory) -> Self {
        Self {
            loader,
            config,
            deps,
            session: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Load a recording and make it the current session
    pub async fn open(&self, id: &str) -> AppResult<OpenOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.take_and_teardown();

        let loaded = self.loader.load(id).await;
        if self.is_stale(generation) {
            tracing::debug!("Discarding superseded load of {}", id);
            return Ok(OpenOutcome::Superseded);
        }
        let Some(loaded) = loaded? else {
            return Ok(OpenOutcome::NotFound);
        };

        let mut slot = self.session.lock();
        // Re-check under the lock so a close racing the check above wins.
        if self.is_stale(generation) {
            tracing::debug!("Discarding superseded load of {}", id);
            return Ok(OpenOutcome::Superseded);
        }

        let deps = (self.deps)(&loaded);
        let session = PlayerSession::open(loaded, deps, &self.config);
        let view = session.view();
        if let Some(mut previous) = slot.replace(session) {
            previous.teardown();
        }
        Ok(OpenOutcome::Opened(view))
    }

    /// Close the current session and discard any load in flight
    pub fn close(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.take_and_teardown();
    }

    pub fn is_open(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Run `f` against the current session
    pub fn with_session<R>(&self, f: impl FnOnce(&mut PlayerSession) -> R) -> AppResult<R> {
        let mut slot = self.session.lock();
        let session = slot.as_mut().ok_or(AppError::NoSession)?;
        Ok(f(session))
    }

    pub fn view(&self) -> AppResult<PlayerView> {
        self.with_session(|session| session.view())
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    fn take_and_teardown(&self) {
        let previous = self.session.lock().take();
        if let Some(mut session) = previous {
            session.teardown();
        }
    }
}

impl Drop for PlayerHost {
    fn drop(&mut self) {
        self.take_and_teardown();
    }
}
