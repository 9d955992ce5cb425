use serde::{Deserialize, Serialize};

use crate::models::affect::AffectState;
use crate::models::struggle::Struggle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyDirection {
    Harder,
    Easier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifficultySuggestion {
    pub direction: DifficultyDirection,
    pub confidence: f64,
    /// 0 = no extra scaffolding, 3 = maximum hand-holding.
    pub hint_level: u8,
    pub reason: String,
}

/// Silent content-selection bias; applied by the caller without surfacing
/// a visible setting change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShadowAdjustments {
    pub difficulty_bias: f64,
    pub avoid_concepts: Vec<String>,
    pub prefer_concepts: Vec<String>,
    pub micro_challenges: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowTarget {
    SlightlyHarder,
    Easier,
    EasyWin,
    Balanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowRecommendation {
    pub target: FlowTarget,
    pub reason: String,
    /// Set when the worst unresolved struggle has recurred enough to
    /// warrant a dedicated micro-lesson.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub micro_lesson: Option<String>,
}

/// A challenge the caller is considering serving next. `difficulty` is the
/// content catalog's normalized rating in [0, 1].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChallengeCandidate {
    pub challenge_id: String,
    pub difficulty: f64,
    pub concept_tags: Vec<String>,
}

/// Debug/observability snapshot of the whole engine, for `get_state()`.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub learner_id: String,
    pub affect: AffectState,
    pub observation_count: usize,
    pub unresolved_struggles: Vec<Struggle>,
    pub resolved_struggles: usize,
    pub mastered_concepts: Vec<String>,
    pub struggling_concepts: Vec<String>,
    pub learning_velocity: f64,
    pub should_intervene: bool,
}
