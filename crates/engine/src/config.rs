// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler configuration
//!
//! Loaded from TOML. Durations use humantime syntax (`"30s"`, `"1m"`).
//!
//! ```toml
//! instance_name = "reports"
//! thread_count = 4
//! misfire_threshold = "2m"
//! ```

use crate::error::SchedulerError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_INSTANCE_NAME: &str = "KairosScheduler";
pub const DEFAULT_INSTANCE_ID: &str = "NON_CLUSTERED";

/// Tunables for one scheduler instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    pub instance_name: String,
    /// Prefix of every fire instance id
    pub instance_id: String,
    /// Number of jobs that may run at once
    pub thread_count: usize,
    /// Most triggers acquired per pass of the acquisition loop
    pub max_batch_size: usize,
    /// How far past the earliest due trigger a batch may reach
    #[serde(with = "humantime_serde")]
    pub batch_time_window: Duration,
    /// How long the loop sleeps when nothing is due
    #[serde(with = "humantime_serde")]
    pub idle_wait_time: Duration,
    /// How late a trigger may be before it counts as misfired
    #[serde(with = "humantime_serde")]
    pub misfire_threshold: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            instance_name: DEFAULT_INSTANCE_NAME.to_string(),
            instance_id: DEFAULT_INSTANCE_ID.to_string(),
            thread_count: 10,
            max_batch_size: 1,
            batch_time_window: Duration::ZERO,
            idle_wait_time: Duration::from_secs(30),
            misfire_threshold: Duration::from_secs(60),
        }
    }
}

impl SchedulerConfig {
    pub fn load(path: &Path) -> Result<Self, SchedulerError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SchedulerError> {
        let config: Self =
            toml::from_str(content).map_err(|e| SchedulerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.instance_name.trim().is_empty() {
            return Err(SchedulerError::Config(
                "instance_name must not be empty".to_string(),
            ));
        }
        if self.thread_count == 0 {
            return Err(SchedulerError::Config(
                "thread_count must be at least 1".to_string(),
            ));
        }
        if self.max_batch_size == 0 {
            return Err(SchedulerError::Config(
                "max_batch_size must be at least 1".to_string(),
            ));
        }
        if self.idle_wait_time < Duration::from_secs(1) {
            return Err(SchedulerError::Config(
                "idle_wait_time must be at least 1s".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn misfire_threshold_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.misfire_threshold).unwrap_or(chrono::Duration::MAX)
    }

    pub(crate) fn batch_time_window_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.batch_time_window).unwrap_or(chrono::Duration::MAX)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
