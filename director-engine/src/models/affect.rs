use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decaying affect scalars plus lifetime counters; one row per learner.
/// Only the affect model mutates it, and only through the paths in
/// `services::affect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffectState {
    pub frustration: f64,
    pub momentum: f64,
    pub total_successes: u32,
    pub total_failures: u32,
    pub first_try_successes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success: Option<DateTime<Utc>>,
}

impl Default for AffectState {
    fn default() -> Self {
        Self {
            frustration: 0.0,
            momentum: 0.5,
            total_successes: 0,
            total_failures: 0,
            first_try_successes: 0,
            last_success: None,
        }
    }
}
