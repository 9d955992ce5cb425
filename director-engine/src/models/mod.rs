pub mod affect;
pub mod intervention;
pub mod mastery;
pub mod observation;
pub mod recommendation;
pub mod struggle;

pub use affect::AffectState;
pub use intervention::{Intervention, InterventionKind, InterventionSource};
pub use mastery::{Mastery, MasteryKind};
pub use observation::{Observation, ObservationInput};
pub use recommendation::{
    ChallengeCandidate, DifficultyDirection, DifficultySuggestion, EngineSnapshot,
    FlowRecommendation, FlowTarget, ShadowAdjustments,
};
pub use struggle::{struggle_key, Struggle, StruggleCandidate, StruggleKey, StruggleKind};
