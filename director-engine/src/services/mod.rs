pub mod affect;
pub mod classifier;
pub mod engine;
pub mod intervention;
pub mod mastery_tracker;
pub mod observation_log;
pub mod recommendation;
pub mod registry;
pub mod struggle_ledger;

pub use engine::{DirectorEngine, ObserveOutcome};
pub use registry::EngineRegistry;
