use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::config::DirectorConfig;
use crate::error::DirectorError;
use crate::generative::GenerativeBackend;
use crate::metrics;
use crate::models::{
    ChallengeCandidate, DifficultySuggestion, EngineSnapshot, FlowRecommendation, Intervention,
    Mastery, Observation, ObservationInput, ShadowAdjustments, Struggle, StruggleKind,
    struggle_key,
};
use crate::services::affect::AffectModel;
use crate::services::classifier::StruggleClassifier;
use crate::services::intervention::InterventionPolicy;
use crate::services::mastery_tracker::MasteryTracker;
use crate::services::observation_log::ObservationLog;
use crate::services::recommendation::Recommender;
use crate::services::struggle_ledger::StruggleLedger;
use crate::store::LearnerStore;
use crate::utils::retry::{retry_async_with_config, RetryConfig};

/// What one `observe()` call changed, so callers can react without
/// re-reading the whole state.
#[derive(Debug, Clone)]
pub struct ObserveOutcome {
    pub finding_kinds: Vec<StruggleKind>,
    pub resolved_struggles: usize,
}

/// The adaptive learner-model engine: one instance per learner, all
/// mutation serialized by the owning registry. Persistence is
/// fire-and-forget; the in-memory state is authoritative for this
/// instance's lifetime.
pub struct DirectorEngine {
    learner_id: String,
    config: DirectorConfig,
    store: Arc<dyn LearnerStore>,
    observations: ObservationLog,
    mastery: MasteryTracker,
    ledger: StruggleLedger,
    affect: AffectModel,
    policy: InterventionPolicy,
    recommender: Recommender,
}

impl DirectorEngine {
    /// Hydrate an engine from the store. Any load failure degrades to
    /// empty defaults; the learner starts fresh rather than erroring.
    pub async fn load(
        learner_id: impl Into<String>,
        config: DirectorConfig,
        store: Arc<dyn LearnerStore>,
        backend: Option<Arc<dyn GenerativeBackend>>,
    ) -> Self {
        let learner_id = learner_id.into();

        let state = match store.load_state(&learner_id).await {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Failed to load affect state for {}: {:#}", learner_id, e);
                Default::default()
            }
        };

        let mastery_rows = match store.load_mastery(&learner_id).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Failed to load mastery for {}: {:#}", learner_id, e);
                Default::default()
            }
        };

        let struggle_rows = match store.load_struggles(&learner_id).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Failed to load struggles for {}: {:#}", learner_id, e);
                Default::default()
            }
        };

        let recent = match store
            .load_recent_observations(&learner_id, config.observation_cache_limit)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Failed to load observations for {}: {:#}", learner_id, e);
                Vec::new()
            }
        };

        tracing::info!(
            "Engine loaded: learner={}, observations={}, mastery_keys={}, struggles={}",
            learner_id,
            recent.len(),
            mastery_rows.len(),
            struggle_rows.len()
        );

        Self {
            learner_id,
            policy: InterventionPolicy::new(config.clone(), backend),
            recommender: Recommender::new(config.clone()),
            config,
            store,
            observations: ObservationLog::hydrate(recent),
            mastery: MasteryTracker::hydrate(mastery_rows),
            ledger: StruggleLedger::hydrate(struggle_rows),
            affect: AffectModel::hydrate(state),
        }
    }

    pub fn learner_id(&self) -> &str {
        &self.learner_id
    }

    /// Ingest one submission observation: mastery fan-out, classification
    /// on failure, resolution on success, affect update, background saves.
    pub fn observe(&mut self, input: ObservationInput) -> Result<ObserveOutcome, DirectorError> {
        input
            .validate()
            .map_err(|e| DirectorError::InvalidObservation(e.to_string()))?;
        if input.tests_passed > input.tests_total {
            return Err(DirectorError::InvalidObservation(format!(
                "tests_passed {} exceeds tests_total {}",
                input.tests_passed, input.tests_total
            )));
        }
        if input.learner_id != self.learner_id {
            return Err(DirectorError::LearnerMismatch {
                expected: self.learner_id.clone(),
                got: input.learner_id,
            });
        }

        let observation = input.into_observation();
        metrics::record_observation(observation.success);

        let touched_mastery = self.mastery.record_observation(&observation);

        let mut finding_kinds = Vec::new();
        let mut resolved_struggles = 0;

        let touched_struggles: Vec<Struggle> = if observation.success {
            let resolved = self.ledger.resolve_related(&observation);
            resolved_struggles = resolved.len();
            for _ in 0..resolved_struggles {
                metrics::STRUGGLES_RESOLVED_TOTAL.inc();
            }
            resolved
        } else {
            let candidates = StruggleClassifier::classify(&observation);
            let recorded = self.ledger.record_all(&observation, candidates);
            for row in &recorded {
                self.affect.on_struggle_detected(row.frequency);
                metrics::record_finding(row.kind.as_str());
                finding_kinds.push(row.kind);
            }
            recorded
        };

        self.affect.on_observation(&observation);

        tracing::info!(
            "Observation processed: learner={}, challenge={}, success={}, findings={}, resolved={}",
            self.learner_id,
            observation.challenge_id,
            observation.success,
            finding_kinds.len(),
            resolved_struggles
        );

        self.spawn_saves(observation, touched_mastery, touched_struggles);

        Ok(ObserveOutcome {
            finding_kinds,
            resolved_struggles,
        })
    }

    /// Explicit emotional feedback from the learner.
    pub fn observe_emotion(&mut self, enjoyment: f64, frustration: f64) {
        self.affect.on_emotional_feedback(enjoyment, frustration);
        tracing::debug!(
            "Emotional feedback: learner={}, frustration now {:.2}",
            self.learner_id,
            self.affect.state().frustration
        );
        self.spawn_state_save();
    }

    pub fn should_intervene(&self) -> bool {
        self.policy
            .should_intervene(self.affect.state(), &self.ledger, Utc::now())
    }

    pub async fn get_intervention(&self) -> Option<Intervention> {
        let intervention = self
            .policy
            .get_intervention(self.affect.state(), &self.ledger, Utc::now())
            .await;
        if let Some(iv) = &intervention {
            metrics::record_intervention(iv.kind.as_str(), iv.source.as_str());
        }
        intervention
    }

    /// Caller-facing explicit resolution, e.g. after the learner dismisses
    /// a struggle as understood.
    pub fn mark_struggle_resolved(&mut self, kind: StruggleKind, description: &str) -> bool {
        let key = struggle_key(kind, description);
        match self.ledger.mark_resolved(&key) {
            Some(row) => {
                metrics::STRUGGLES_RESOLVED_TOTAL.inc();
                self.spawn_struggle_save(row);
                true
            }
            None => false,
        }
    }

    pub fn get_mastered_concepts(&self) -> Vec<String> {
        self.mastery.mastered_concepts()
    }

    pub fn get_struggling_concepts(&self) -> Vec<String> {
        self.mastery.struggling_concepts()
    }

    pub fn get_learning_velocity(&self) -> f64 {
        self.recommender.learning_velocity(&self.observations)
    }

    pub fn get_difficulty_suggestion(&self) -> Option<DifficultySuggestion> {
        self.recommender
            .difficulty_suggestion(&self.observations, self.affect.state(), &self.ledger)
    }

    pub fn get_shadow_adjustments(&self) -> ShadowAdjustments {
        self.recommender.shadow_adjustments(
            &self.observations,
            &self.mastery,
            &self.ledger,
            self.affect.state(),
        )
    }

    pub fn get_flow_recommendation(&self) -> FlowRecommendation {
        self.recommender.flow_recommendation(
            &self.observations,
            self.affect.state(),
            &self.ledger,
            Utc::now(),
        )
    }

    pub fn score_challenge_for_flow(&self, candidate: &ChallengeCandidate) -> f64 {
        let shadow = self.get_shadow_adjustments();
        self.recommender
            .score_challenge(candidate, &self.mastery, &shadow)
    }

    /// Debug/observability snapshot.
    pub fn get_state(&self) -> EngineSnapshot {
        EngineSnapshot {
            learner_id: self.learner_id.clone(),
            affect: self.affect.state().clone(),
            observation_count: self.observations.len(),
            unresolved_struggles: self.ledger.unresolved(),
            resolved_struggles: self.ledger.resolved_count(),
            mastered_concepts: self.mastery.mastered_concepts(),
            struggling_concepts: self.mastery.struggling_concepts(),
            learning_velocity: self.get_learning_velocity(),
            should_intervene: self.should_intervene(),
        }
    }

    // Background persistence: spawn, retry aggressively, log on permanent
    // failure and keep serving from memory.

    fn spawn_saves(
        &self,
        observation: Observation,
        touched_mastery: Vec<String>,
        touched_struggles: Vec<Struggle>,
    ) {
        let store = self.store.clone();
        let learner_id = self.learner_id.clone();
        let state = self.affect.state().clone();

        let mastery_rows: Vec<(String, Mastery)> = touched_mastery
            .into_iter()
            .filter_map(|key| self.mastery.get(&key).map(|m| (key, m.clone())))
            .collect();

        tokio::spawn(async move {
            let cfg = RetryConfig::aggressive();

            if let Err(e) = retry_async_with_config(cfg.clone(), || async {
                store.save_observation(&observation).await
            })
            .await
            {
                tracing::error!("Background observation save failed: {:#}", e);
            }

            if let Err(e) =
                retry_async_with_config(cfg.clone(), || async { store.save_state(&learner_id, &state).await })
                    .await
            {
                tracing::error!("Background state save failed: {:#}", e);
            }

            for (key, mastery) in &mastery_rows {
                if let Err(e) = retry_async_with_config(cfg.clone(), || async {
                    store.save_mastery(&learner_id, key, mastery).await
                })
                .await
                {
                    tracing::error!("Background mastery save failed for {}: {:#}", key, e);
                }
            }

            for struggle in &touched_struggles {
                let key = struggle.storage_key();
                if let Err(e) = retry_async_with_config(cfg.clone(), || async {
                    store.save_struggle(&learner_id, &key, struggle).await
                })
                .await
                {
                    tracing::error!("Background struggle save failed for {}: {:#}", key, e);
                }
            }
        });
    }

    fn spawn_state_save(&self) {
        let store = self.store.clone();
        let learner_id = self.learner_id.clone();
        let state = self.affect.state().clone();

        tokio::spawn(async move {
            let cfg = RetryConfig::aggressive();
            if let Err(e) =
                retry_async_with_config(cfg, || async { store.save_state(&learner_id, &state).await })
                    .await
            {
                tracing::error!("Background state save failed: {:#}", e);
            }
        });
    }

    fn spawn_struggle_save(&self, struggle: Struggle) {
        let store = self.store.clone();
        let learner_id = self.learner_id.clone();

        tokio::spawn(async move {
            let cfg = RetryConfig::aggressive();
            let key = struggle.storage_key();
            if let Err(e) = retry_async_with_config(cfg, || async {
                store.save_struggle(&learner_id, &key, &struggle).await
            })
            .await
            {
                tracing::error!("Background struggle save failed for {}: {:#}", key, e);
            }
        });
    }
}
