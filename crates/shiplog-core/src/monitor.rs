use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Polling interval used when a project does not set one.
pub const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Lowest polling interval accepted, bounding load on the hosting API.
pub const MIN_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl MonitorConfig {
    pub fn new(interval_secs: u64) -> Self {
        Self { interval_secs }
    }

    pub fn validate(&self, min_interval_secs: u64) -> Result<(), CoreError> {
        if self.interval_secs < min_interval_secs {
            return Err(CoreError::InvalidInput(format!(
                "polling interval {}s is below the minimum of {}s",
                self.interval_secs, min_interval_secs
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Idle,
    Running,
    Stopping,
    Terminated,
}

impl MonitorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorState::Idle => "idle",
            MonitorState::Running => "running",
            MonitorState::Stopping => "stopping",
            MonitorState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of one project's monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub project_id: String,
    pub running: bool,
    pub state: MonitorState,
    pub interval_secs: u64,
    pub last_check: Option<DateTime<Utc>>,
    pub sweeps: u64,
}
