use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryKind {
    Concept,
    Challenge,
}

/// Success/failure bookkeeping for one mastery key (a concept tag or a
/// challenge id). Mutated only by the mastery tracker; the competence
/// score is derived on read, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mastery {
    pub kind: MasteryKind,
    pub successes: u32,
    pub failures: u32,
    pub total_time_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest_seconds: Option<f64>,
    pub first_try_successes: u32,
    pub streak: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<DateTime<Utc>>,
}

impl Mastery {
    pub fn new(kind: MasteryKind) -> Self {
        Self {
            kind,
            successes: 0,
            failures: 0,
            total_time_seconds: 0.0,
            fastest_seconds: None,
            first_try_successes: 0,
            streak: 0,
            last_attempt: None,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.successes + self.failures
    }

    /// Derived competence estimate in [0, 1]. Undefined (0.0) until the key
    /// has at least two successes; past that, a weighted blend of success
    /// rate, first-try rate and a capped streak bonus.
    pub fn score(&self) -> f64 {
        if self.successes < 2 {
            return 0.0;
        }
        let attempts = self.attempts() as f64;
        let success_rate = self.successes as f64 / attempts;
        let first_try_rate = self.first_try_successes as f64 / self.successes as f64;
        let streak_bonus = (0.05 * self.streak as f64).min(0.2);
        (0.5 * success_rate + 0.3 * first_try_rate + streak_bonus).clamp(0.0, 1.0)
    }
}
