//! Tracker configuration (`~/.screentrack/config.json`)

use crate::services::store::data_dir;
use crate::services::ACTIVITY_THRESHOLD_SECS;
use crate::types::{Result, ScreentrackError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub tick_interval_secs: u64,
    pub activity_threshold_secs: f64,
    /// Report refresh period for `track`
    pub refresh_interval_secs: u64,
    pub autosave_interval_secs: u64,
    pub top_limit: usize,
    /// Overrides `~/.screentrack/usage.json`
    pub store_path: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 1,
            activity_threshold_secs: ACTIVITY_THRESHOLD_SECS,
            refresh_interval_secs: 10,
            autosave_interval_secs: 60,
            top_limit: 20,
            store_path: None,
        }
    }
}

impl TrackerConfig {
    /// Load from the default location, falling back to defaults when absent.
    pub fn load_default() -> Result<Self> {
        Self::load(&data_dir()?.join(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ScreentrackError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_secs == 0 {
            return Err(ScreentrackError::Config("tick_interval_secs must be > 0".into()));
        }
        if self.refresh_interval_secs == 0 {
            return Err(ScreentrackError::Config("refresh_interval_secs must be > 0".into()));
        }
        if self.autosave_interval_secs == 0 {
            return Err(ScreentrackError::Config("autosave_interval_secs must be > 0".into()));
        }
        if !self.activity_threshold_secs.is_finite() || self.activity_threshold_secs <= 0.0 {
            return Err(ScreentrackError::Config(
                "activity_threshold_secs must be a positive number".into(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }
}
