use thiserror::Error;

/// Boundary errors. Nothing inside the engine raises during normal
/// operation; the only rejections happen before any state mutation.
#[derive(Debug, Error)]
pub enum DirectorError {
    #[error("invalid observation: {0}")]
    InvalidObservation(String),

    #[error("observation for learner '{got}' sent to engine for '{expected}'")]
    LearnerMismatch { expected: String, got: String },
}
