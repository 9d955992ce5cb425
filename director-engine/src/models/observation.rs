use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// One submitted-code event with its outcome. Stored append-only in the
/// "observations" collection; never mutated after intake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub id: String,
    pub learner_id: String,
    pub challenge_id: String,
    pub code: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    pub tests_passed: u32,
    pub tests_total: u32,
    pub elapsed_seconds: f64,
    pub attempt_number: u32,
    pub timestamp: DateTime<Utc>,
    pub concept_tags: Vec<String>,
}

impl Observation {
    /// Lower-cased error output + stdout, the text the classifier rules scan.
    pub fn diagnostic_text(&self) -> String {
        let mut text = String::new();
        if let Some(err) = &self.error_output {
            text.push_str(err);
            text.push('\n');
        }
        if let Some(out) = &self.stdout {
            text.push_str(out);
        }
        text.to_lowercase()
    }

    pub fn had_partial_passes(&self) -> bool {
        self.tests_passed > 0 && self.tests_passed < self.tests_total
    }
}

/// Boundary record for `observe()`. Validated before the engine mutates any
/// state; an id and timestamp are assigned at intake.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ObservationInput {
    #[validate(length(min = 1, message = "learner_id must not be empty"))]
    pub learner_id: String,
    #[validate(length(min = 1, message = "challenge_id must not be empty"))]
    pub challenge_id: String,
    pub code: String,
    pub success: bool,
    pub error_output: Option<String>,
    pub stdout: Option<String>,
    pub tests_passed: u32,
    pub tests_total: u32,
    #[validate(range(min = 0.0, message = "elapsed_seconds must be non-negative"))]
    pub elapsed_seconds: f64,
    #[validate(range(min = 1, message = "attempt_number starts at 1"))]
    pub attempt_number: u32,
    pub concept_tags: Vec<String>,
}

impl ObservationInput {
    pub fn into_observation(self) -> Observation {
        // Preserve tag order, drop duplicates
        let mut seen = std::collections::HashSet::new();
        let concept_tags = self
            .concept_tags
            .into_iter()
            .filter(|tag| seen.insert(tag.clone()))
            .collect();

        Observation {
            id: Uuid::new_v4().to_string(),
            learner_id: self.learner_id,
            challenge_id: self.challenge_id,
            code: self.code,
            success: self.success,
            error_output: self.error_output,
            stdout: self.stdout,
            tests_passed: self.tests_passed,
            tests_total: self.tests_total,
            elapsed_seconds: self.elapsed_seconds,
            attempt_number: self.attempt_number,
            timestamp: Utc::now(),
            concept_tags,
        }
    }
}
