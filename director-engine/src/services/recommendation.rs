use chrono::{DateTime, Utc};

use crate::config::DirectorConfig;
use crate::models::{
    AffectState, ChallengeCandidate, DifficultyDirection, DifficultySuggestion,
    FlowRecommendation, FlowTarget, ShadowAdjustments,
};
use crate::services::mastery_tracker::MasteryTracker;
use crate::services::observation_log::ObservationLog;
use crate::services::struggle_ledger::StruggleLedger;

const MIN_VELOCITY_OBSERVATIONS: usize = 6;
const MIN_DIFFICULTY_OBSERVATIONS: usize = 5;
const BREEZING_SUCCESS_RATE: f64 = 0.9;
const BREEZING_MOMENTUM: f64 = 0.8;
const BREEZING_AVG_SECONDS: f64 = 30.0;
const STRUGGLING_SUCCESS_RATE: f64 = 0.3;
const STRUGGLING_FRUSTRATION: f64 = 0.6;
const STRUGGLING_UNRESOLVED: usize = 3;

/// Derives velocity, difficulty bias and flow-state targets from current
/// learner state. Every method is a pure read; nothing here mutates.
pub struct Recommender {
    config: DirectorConfig,
}

impl Recommender {
    pub fn new(config: DirectorConfig) -> Self {
        Self { config }
    }

    /// Success-rate trend between the last window and the one before it,
    /// plus a 0.3-weighted solve-time improvement term. Needs at least six
    /// observations; clamped to [-1, 1].
    pub fn learning_velocity(&self, log: &ObservationLog) -> f64 {
        let entries = log.entries();
        let n = entries.len();
        let window = self.config.velocity_window;
        if n < window + 1 {
            return 0.0;
        }

        let recent = &entries[n - window..];
        let older = &entries[n.saturating_sub(2 * window)..n - window];

        let mut velocity =
            ObservationLog::success_rate(recent) - ObservationLog::success_rate(older);

        if let (Some(older_avg), Some(recent_avg)) = (
            ObservationLog::avg_success_seconds(older),
            ObservationLog::avg_success_seconds(recent),
        ) {
            if older_avg > 0.0 {
                let time_term = ((older_avg - recent_avg) / older_avg).clamp(-1.0, 1.0);
                velocity += 0.3 * time_term;
            }
        }

        velocity.clamp(-1.0, 1.0)
    }

    pub fn difficulty_suggestion(
        &self,
        log: &ObservationLog,
        affect: &AffectState,
        ledger: &StruggleLedger,
    ) -> Option<DifficultySuggestion> {
        if log.len() < MIN_DIFFICULTY_OBSERVATIONS {
            return None;
        }

        let window = log.last_n(self.config.difficulty_window);
        let success_rate = ObservationLog::success_rate(window);
        let avg_seconds = ObservationLog::avg_elapsed_seconds(window).unwrap_or(0.0);

        if success_rate >= BREEZING_SUCCESS_RATE
            && affect.momentum >= BREEZING_MOMENTUM
            && avg_seconds < BREEZING_AVG_SECONDS
        {
            return Some(DifficultySuggestion {
                direction: DifficultyDirection::Harder,
                confidence: 0.8,
                hint_level: 0,
                reason: format!(
                    "Cruising: {:.0}% success at {:.0}s average with momentum {:.2}",
                    success_rate * 100.0,
                    avg_seconds,
                    affect.momentum
                ),
            });
        }

        let mut signals = 0u8;
        let mut reasons = Vec::new();
        if success_rate <= STRUGGLING_SUCCESS_RATE {
            signals += 1;
            reasons.push(format!("success rate down to {:.0}%", success_rate * 100.0));
        }
        if affect.frustration >= STRUGGLING_FRUSTRATION {
            signals += 1;
            reasons.push(format!("frustration at {:.2}", affect.frustration));
        }
        if ledger.unresolved_count() >= STRUGGLING_UNRESOLVED {
            signals += 1;
            reasons.push(format!(
                "{} unresolved struggle patterns",
                ledger.unresolved_count()
            ));
        }

        if signals == 0 {
            return None;
        }

        Some(DifficultySuggestion {
            direction: DifficultyDirection::Easier,
            confidence: (0.45 + 0.15 * signals as f64).min(0.9),
            hint_level: signals.min(3),
            reason: reasons.join("; "),
        })
    }

    pub fn shadow_adjustments(
        &self,
        log: &ObservationLog,
        mastery: &MasteryTracker,
        ledger: &StruggleLedger,
        affect: &AffectState,
    ) -> ShadowAdjustments {
        let mut bias = 0.0;

        let window = log.last_n(self.config.difficulty_window);
        if !window.is_empty() {
            let success_rate = ObservationLog::success_rate(window);
            if success_rate < 0.3 {
                bias -= 0.3;
            } else if success_rate > 0.8 && affect.momentum > 0.7 {
                bias += 0.2;
            }
            if affect.frustration > 0.5 {
                bias -= 0.2;
            }
        }

        let velocity = self.learning_velocity(log);
        if velocity > 0.2 {
            bias += 0.1;
        } else if velocity < -0.2 {
            bias -= 0.1;
        }
        bias = bias.clamp(-0.4, 0.3);

        let mut micro_challenges = ledger.concept_gap_topics(2);
        micro_challenges.extend(mastery.building_concepts());

        ShadowAdjustments {
            difficulty_bias: bias,
            avoid_concepts: mastery.struggling_concepts(),
            prefer_concepts: mastery.mastered_concepts(),
            micro_challenges,
        }
    }

    pub fn flow_recommendation(
        &self,
        log: &ObservationLog,
        affect: &AffectState,
        ledger: &StruggleLedger,
        now: DateTime<Utc>,
    ) -> FlowRecommendation {
        let window = log.last_n(self.config.difficulty_window);
        let success_rate = ObservationLog::success_rate(window);
        let avg_seconds = ObservationLog::avg_elapsed_seconds(window).unwrap_or(0.0);
        let velocity = self.learning_velocity(log);

        let struggling = (!window.is_empty() && success_rate <= STRUGGLING_SUCCESS_RATE)
            || affect.frustration >= STRUGGLING_FRUSTRATION
            || ledger.unresolved_count() >= STRUGGLING_UNRESOLVED;
        let breezing = !window.is_empty()
            && success_rate >= BREEZING_SUCCESS_RATE
            && affect.momentum >= BREEZING_MOMENTUM
            && avg_seconds < BREEZING_AVG_SECONDS;

        let (target, reason) = if struggling && affect.frustration >= STRUGGLING_FRUSTRATION {
            (
                FlowTarget::EasyWin,
                "Frustration is high; a quick win rebuilds confidence".to_string(),
            )
        } else if struggling {
            (
                FlowTarget::Easier,
                "Recent results point below the current difficulty band".to_string(),
            )
        } else if breezing || (velocity > 0.3 && affect.momentum >= BREEZING_MOMENTUM) {
            (
                FlowTarget::SlightlyHarder,
                "Progress is fast and steady; room to stretch".to_string(),
            )
        } else {
            (
                FlowTarget::Balanced,
                "Current difficulty band matches the trend".to_string(),
            )
        };

        let micro_lesson = ledger
            .worst_unresolved(now)
            .filter(|s| s.frequency >= self.config.struggle_frequency_threshold)
            .map(|s| s.description.clone());

        FlowRecommendation {
            target,
            reason,
            micro_lesson,
        }
    }

    /// Score an arbitrary candidate challenge against the current learner
    /// state; higher is a better fit. Clamped to [0, 1].
    pub fn score_challenge(
        &self,
        candidate: &ChallengeCandidate,
        mastery: &MasteryTracker,
        shadow: &ShadowAdjustments,
    ) -> f64 {
        let mut score = 0.5;

        let target_difficulty = (0.5 + shadow.difficulty_bias).clamp(0.0, 1.0);
        let distance = (candidate.difficulty - target_difficulty).abs();
        if distance <= 0.15 {
            score += 0.2;
        } else if distance <= 0.3 {
            score += 0.1;
        }

        for tag in &candidate.concept_tags {
            if shadow.prefer_concepts.contains(tag) {
                score += 0.15;
            }
            if shadow.avoid_concepts.contains(tag) {
                score -= 0.3;
            }
        }

        let tag_scores: Vec<f64> = candidate
            .concept_tags
            .iter()
            .filter_map(|tag| mastery.get(tag).map(|m| m.score()))
            .collect();
        if tag_scores.iter().any(|s| (0.3..=0.7).contains(s)) {
            score += 0.1;
        }
        if tag_scores.iter().any(|s| *s > 0.9) {
            score -= 0.1;
        }

        score.clamp(0.0, 1.0)
    }
}
