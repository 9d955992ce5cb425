use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{AffectState, Mastery, Observation, Struggle};
use crate::store::LearnerStore;

/// In-memory store, used by tests and by callers that run the engine
/// without a durable backend.
#[derive(Default)]
pub struct MemoryStore {
    fail_writes: bool,
    states: RwLock<HashMap<String, AffectState>>,
    observations: RwLock<HashMap<String, Vec<Observation>>>,
    mastery: RwLock<HashMap<String, HashMap<String, Mastery>>>,
    struggles: RwLock<HashMap<String, HashMap<String, Struggle>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail; exercises the log-and-continue
    /// persistence path.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            anyhow::bail!("memory store configured to fail writes");
        }
        Ok(())
    }

    pub async fn observation_count(&self, learner_id: &str) -> usize {
        self.observations
            .read()
            .await
            .get(learner_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl LearnerStore for MemoryStore {
    async fn load_state(&self, learner_id: &str) -> Result<Option<AffectState>> {
        Ok(self.states.read().await.get(learner_id).cloned())
    }

    async fn save_state(&self, learner_id: &str, state: &AffectState) -> Result<()> {
        self.check_writable()?;
        self.states
            .write()
            .await
            .insert(learner_id.to_string(), state.clone());
        Ok(())
    }

    async fn load_recent_observations(
        &self,
        learner_id: &str,
        limit: usize,
    ) -> Result<Vec<Observation>> {
        let all = self.observations.read().await;
        let rows = all.get(learner_id).cloned().unwrap_or_default();
        let skip = rows.len().saturating_sub(limit);
        Ok(rows.into_iter().skip(skip).collect())
    }

    async fn save_observation(&self, observation: &Observation) -> Result<()> {
        self.check_writable()?;
        self.observations
            .write()
            .await
            .entry(observation.learner_id.clone())
            .or_default()
            .push(observation.clone());
        Ok(())
    }

    async fn load_mastery(&self, learner_id: &str) -> Result<HashMap<String, Mastery>> {
        Ok(self
            .mastery
            .read()
            .await
            .get(learner_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_mastery(&self, learner_id: &str, key: &str, mastery: &Mastery) -> Result<()> {
        self.check_writable()?;
        self.mastery
            .write()
            .await
            .entry(learner_id.to_string())
            .or_default()
            .insert(key.to_string(), mastery.clone());
        Ok(())
    }

    async fn load_struggles(&self, learner_id: &str) -> Result<HashMap<String, Struggle>> {
        Ok(self
            .struggles
            .read()
            .await
            .get(learner_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_struggle(&self, learner_id: &str, key: &str, struggle: &Struggle) -> Result<()> {
        self.check_writable()?;
        self.struggles
            .write()
            .await
            .entry(learner_id.to_string())
            .or_default()
            .insert(key.to_string(), struggle.clone());
        Ok(())
    }
}
