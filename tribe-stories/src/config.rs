//! Configuration for the story viewer
//!
//! Read from the `[viewer]` table of the shared Tribe `config.toml`. Every
//! field has a built-in default, so an absent table is valid.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// Viewer tuning knobs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// How long each story stays on screen
    pub story_duration_ms: u64,

    /// Progress timer polling interval
    pub tick_interval_ms: u64,

    /// Timeout applied to every backend request
    pub request_timeout_ms: u64,

    /// Longest clip the story camera records
    pub max_recording_ms: u64,

    /// Event bus buffer size
    pub event_capacity: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            story_duration_ms: 15_000,
            tick_interval_ms: 50,
            request_timeout_ms: 30_000,
            max_recording_ms: 15_000,
            event_capacity: 100,
        }
    }
}

impl ViewerConfig {
    /// Build from the `[viewer]` table (None → defaults), then validate
    pub fn from_section(section: Option<&toml::Table>) -> Result<Self> {
        let config = match section {
            Some(table) => toml::Value::Table(table.clone())
                .try_into::<ViewerConfig>()
                .map_err(|e| Error::Config(format!("Invalid [viewer] section: {}", e)))?,
            None => ViewerConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the progress timer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.story_duration_ms == 0 {
            return Err(Error::Config("story_duration_ms must be > 0".to_string()));
        }
        if self.tick_interval_ms == 0 {
            return Err(Error::Config("tick_interval_ms must be > 0".to_string()));
        }
        if self.tick_interval_ms > self.story_duration_ms {
            return Err(Error::Config(format!(
                "tick_interval_ms ({}) exceeds story_duration_ms ({})",
                self.tick_interval_ms, self.story_duration_ms
            )));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn max_recording(&self) -> Duration {
        Duration::from_millis(self.max_recording_ms)
    }
}
