use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::Database;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};

use crate::models::{AffectState, Mastery, Observation, Struggle};
use crate::store::LearnerStore;

const STATE_CACHE_TTL: u64 = 86400; // 24 hours

#[derive(Debug, Serialize, Deserialize)]
struct StateRow {
    #[serde(rename = "_id")]
    id: String,
    state: AffectState,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MasteryRow {
    #[serde(rename = "_id")]
    id: String,
    learner_id: String,
    key: String,
    mastery: Mastery,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StruggleRow {
    #[serde(rename = "_id")]
    id: String,
    learner_id: String,
    key: String,
    struggle: Struggle,
    updated_at: DateTime<Utc>,
}

/// Durable learner rows in MongoDB with a Redis hot cache for the affect
/// state, which is read on every engine load.
pub struct MongoStore {
    mongo: Database,
    redis: ConnectionManager,
}

impl MongoStore {
    pub fn new(mongo: Database, redis: ConnectionManager) -> Self {
        Self { mongo, redis }
    }

    fn state_cache_key(learner_id: &str) -> String {
        format!("director:state:{}", learner_id)
    }

    async fn cache_state(&self, learner_id: &str, state: &AffectState) -> Result<()> {
        let mut conn = self.redis.clone();
        let json = serde_json::to_string(state).context("Failed to serialize affect state")?;

        redis::cmd("SETEX")
            .arg(Self::state_cache_key(learner_id))
            .arg(STATE_CACHE_TTL)
            .arg(&json)
            .query_async::<()>(&mut conn)
            .await
            .context("Failed to cache affect state")?;

        Ok(())
    }

    async fn cached_state(&self, learner_id: &str) -> Result<Option<AffectState>> {
        let mut conn = self.redis.clone();

        let raw: Option<String> = redis::cmd("GET")
            .arg(Self::state_cache_key(learner_id))
            .query_async(&mut conn)
            .await
            .context("Failed to read affect state cache")?;

        match raw {
            Some(json) => {
                let state = serde_json::from_str(&json)
                    .context("Failed to deserialize cached affect state")?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn upsert<T: Serialize + Send + Sync>(
        &self,
        collection: &str,
        id: &str,
        row: &T,
    ) -> Result<()> {
        let coll: mongodb::Collection<T> = self.mongo.collection(collection);
        coll.replace_one(mongodb::bson::doc! { "_id": id }, row)
            .with_options(
                mongodb::options::ReplaceOptions::builder()
                    .upsert(true)
                    .build(),
            )
            .await
            .with_context(|| format!("Failed to upsert into {}", collection))?;
        Ok(())
    }
}

#[async_trait]
impl LearnerStore for MongoStore {
    async fn load_state(&self, learner_id: &str) -> Result<Option<AffectState>> {
        // 1. Hot cache
        match self.cached_state(learner_id).await {
            Ok(Some(state)) => {
                tracing::debug!("Affect state cache hit for learner={}", learner_id);
                return Ok(Some(state));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Affect state cache read failed for {}: {:#}", learner_id, e);
            }
        }

        // 2. Durable row
        let collection: mongodb::Collection<StateRow> = self.mongo.collection("learner_state");
        let row = collection
            .find_one(mongodb::bson::doc! { "_id": learner_id })
            .await
            .context("Failed to query learner_state collection")?;

        Ok(row.map(|r| r.state))
    }

    async fn save_state(&self, learner_id: &str, state: &AffectState) -> Result<()> {
        let row = StateRow {
            id: learner_id.to_string(),
            state: state.clone(),
            updated_at: Utc::now(),
        };
        self.upsert("learner_state", learner_id, &row).await?;

        // Cache refresh is best-effort
        if let Err(e) = self.cache_state(learner_id, state).await {
            tracing::warn!("Failed to refresh state cache for {}: {:#}", learner_id, e);
        }

        Ok(())
    }

    async fn load_recent_observations(
        &self,
        learner_id: &str,
        limit: usize,
    ) -> Result<Vec<Observation>> {
        let collection: mongodb::Collection<Observation> = self.mongo.collection("observations");

        let cursor = collection
            .find(mongodb::bson::doc! { "learner_id": learner_id })
            .sort(mongodb::bson::doc! { "timestamp": -1 })
            .limit(limit as i64)
            .await
            .context("Failed to query observations collection")?;

        let mut rows: Vec<Observation> = cursor
            .try_collect()
            .await
            .context("Failed to read observations cursor")?;

        // Query returned newest-first; callers expect chronological order
        rows.reverse();
        Ok(rows)
    }

    async fn save_observation(&self, observation: &Observation) -> Result<()> {
        let collection: mongodb::Collection<Observation> = self.mongo.collection("observations");
        collection
            .insert_one(observation)
            .await
            .context("Failed to save observation to MongoDB")?;
        tracing::debug!(
            "Observation saved: learner={}, challenge={}, id={}",
            observation.learner_id,
            observation.challenge_id,
            observation.id
        );
        Ok(())
    }

    async fn load_mastery(&self, learner_id: &str) -> Result<HashMap<String, Mastery>> {
        let collection: mongodb::Collection<MasteryRow> = self.mongo.collection("mastery");

        let cursor = collection
            .find(mongodb::bson::doc! { "learner_id": learner_id })
            .await
            .context("Failed to query mastery collection")?;

        let rows: Vec<MasteryRow> = cursor
            .try_collect()
            .await
            .context("Failed to read mastery cursor")?;

        Ok(rows.into_iter().map(|r| (r.key, r.mastery)).collect())
    }

    async fn save_mastery(&self, learner_id: &str, key: &str, mastery: &Mastery) -> Result<()> {
        let id = format!("{}:{}", learner_id, key);
        let row = MasteryRow {
            id: id.clone(),
            learner_id: learner_id.to_string(),
            key: key.to_string(),
            mastery: mastery.clone(),
            updated_at: Utc::now(),
        };
        self.upsert("mastery", &id, &row).await
    }

    async fn load_struggles(&self, learner_id: &str) -> Result<HashMap<String, Struggle>> {
        let collection: mongodb::Collection<StruggleRow> = self.mongo.collection("struggles");

        let cursor = collection
            .find(mongodb::bson::doc! { "learner_id": learner_id })
            .await
            .context("Failed to query struggles collection")?;

        let rows: Vec<StruggleRow> = cursor
            .try_collect()
            .await
            .context("Failed to read struggles cursor")?;

        Ok(rows.into_iter().map(|r| (r.key, r.struggle)).collect())
    }

    async fn save_struggle(&self, learner_id: &str, key: &str, struggle: &Struggle) -> Result<()> {
        let id = format!("{}:{}", learner_id, key);
        let row = StruggleRow {
            id: id.clone(),
            learner_id: learner_id.to_string(),
            key: key.to_string(),
            struggle: struggle.clone(),
            updated_at: Utc::now(),
        };
        self.upsert("struggles", &id, &row).await
    }
}
