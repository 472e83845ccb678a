//! Player configuration
//!
//! Loaded from a JSON file; every field is optional and falls back to the
//! defaults below.

use crate::replay::engine::ReplayerConfig;
use crate::utils::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerConfig {
    /// Playhead advance per frame when no video drives the timeline
    pub frame_step_ms: f64,
    /// Wall-clock time between headless frames
    pub frame_interval_ms: u64,
    /// Timeout for fetching externally hosted logs
    pub fetch_timeout_secs: u64,
    /// Element id of the container the replay overlay mounts into
    pub overlay_target: String,
    pub replayer: ReplayerConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            frame_step_ms: 16.0,
            frame_interval_ms: 16,
            fetch_timeout_secs: 15,
            overlay_target: "replay-overlay".to_string(),
            replayer: ReplayerConfig::default(),
        }
    }
}

impl PlayerConfig {
    /// Read and validate a config file
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PlayerConfig = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::debug!("Loaded player config from {:?}", path);
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> AppResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if !(self.frame_step_ms.is_finite() && self.frame_step_ms > 0.0) {
            return Err(AppError::Config(format!(
                "frameStepMs must be positive, got {}",
                self.frame_step_ms
            )));
        }
        if self.frame_interval_ms == 0 {
            return Err(AppError::Config("frameIntervalMs must be positive".to_string()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(AppError::Config("fetchTimeoutSecs must be positive".to_string()));
        }
        if !(self.replayer.speed.is_finite() && self.replayer.speed > 0.0) {
            return Err(AppError::Config(format!(
                "replayer.speed must be positive, got {}",
                self.replayer.speed
            )));
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
