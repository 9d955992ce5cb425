use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::config::DirectorConfig;
use crate::generative::GenerativeBackend;
use crate::services::engine::DirectorEngine;
use crate::store::LearnerStore;

/// Caller-owned map of per-learner engines. Each engine sits behind its
/// own mutex, so mutation for one learner is serialized while different
/// learners proceed concurrently.
pub struct EngineRegistry {
    config: DirectorConfig,
    store: Arc<dyn LearnerStore>,
    backend: Option<Arc<dyn GenerativeBackend>>,
    engines: RwLock<HashMap<String, Arc<Mutex<DirectorEngine>>>>,
}

impl EngineRegistry {
    pub fn new(
        config: DirectorConfig,
        store: Arc<dyn LearnerStore>,
        backend: Option<Arc<dyn GenerativeBackend>>,
    ) -> Self {
        Self {
            config,
            store,
            backend,
            engines: RwLock::new(HashMap::new()),
        }
    }

    /// The engine for a learner, hydrating it from the store on first use.
    pub async fn get_or_create(&self, learner_id: &str) -> Arc<Mutex<DirectorEngine>> {
        if let Some(engine) = self.engines.read().await.get(learner_id) {
            return engine.clone();
        }

        // Load outside the write lock would allow a duplicate hydration;
        // the double-checked insert below keeps the first one.
        let mut engines = self.engines.write().await;
        if let Some(engine) = engines.get(learner_id) {
            return engine.clone();
        }

        let engine = DirectorEngine::load(
            learner_id,
            self.config.clone(),
            self.store.clone(),
            self.backend.clone(),
        )
        .await;

        let engine = Arc::new(Mutex::new(engine));
        engines.insert(learner_id.to_string(), engine.clone());
        tracing::info!("Engine created for learner={}", learner_id);
        engine
    }

    /// Drop a learner's engine; the next access re-hydrates from the store.
    pub async fn evict(&self, learner_id: &str) -> bool {
        self.engines.write().await.remove(learner_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.engines.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.engines.read().await.is_empty()
    }
}
