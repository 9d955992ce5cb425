use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{AffectState, Mastery, Observation, Struggle};

/// Read/write contract the engine holds against the persistence layer.
/// Every call is best-effort from the engine's perspective: loads that fail
/// fall back to empty defaults, saves that fail are logged and the engine
/// continues with in-memory state.
#[async_trait]
pub trait LearnerStore: Send + Sync {
    async fn load_state(&self, learner_id: &str) -> Result<Option<AffectState>>;
    async fn save_state(&self, learner_id: &str, state: &AffectState) -> Result<()>;

    /// Most recent observations for the learner, in chronological order.
    async fn load_recent_observations(
        &self,
        learner_id: &str,
        limit: usize,
    ) -> Result<Vec<Observation>>;
    async fn save_observation(&self, observation: &Observation) -> Result<()>;

    async fn load_mastery(&self, learner_id: &str) -> Result<HashMap<String, Mastery>>;
    async fn save_mastery(&self, learner_id: &str, key: &str, mastery: &Mastery) -> Result<()>;

    async fn load_struggles(&self, learner_id: &str) -> Result<HashMap<String, Struggle>>;
    async fn save_struggle(&self, learner_id: &str, key: &str, struggle: &Struggle) -> Result<()>;
}

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
