use chrono::{DateTime, Utc};

use crate::models::{AffectState, Observation};

const MOMENTUM_GAIN: f64 = 0.1;
const MOMENTUM_LOSS: f64 = 0.05;
const FRUSTRATION_RELIEF: f64 = 0.2;
const STRUGGLE_BUMP: f64 = 0.08;
const REPEAT_STRUGGLE_BUMP: f64 = 0.15;

/// Two decaying scalars summarizing short-term emotional/performance
/// trend. Success relieves frustration and builds momentum; failure bleeds
/// momentum; frustration itself rises only with struggle recurrence and
/// explicit emotional feedback.
pub struct AffectModel {
    state: AffectState,
}

impl AffectModel {
    pub fn hydrate(state: AffectState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AffectState {
        &self.state
    }

    pub fn on_observation(&mut self, observation: &Observation) {
        if observation.success {
            self.state.momentum = (self.state.momentum + MOMENTUM_GAIN).min(1.0);
            self.state.frustration = (self.state.frustration - FRUSTRATION_RELIEF).max(0.0);
            self.state.last_success = Some(observation.timestamp);
            self.state.total_successes += 1;
            if observation.attempt_number == 1 {
                self.state.first_try_successes += 1;
            }
        } else {
            self.state.momentum = (self.state.momentum - MOMENTUM_LOSS).max(0.0);
            self.state.total_failures += 1;
        }
    }

    /// Called once per ledger-recorded finding on a failed observation.
    /// `frequency` is the struggle's count after recording.
    pub fn on_struggle_detected(&mut self, frequency: u32) {
        let bump = if frequency >= 3 {
            REPEAT_STRUGGLE_BUMP
        } else {
            STRUGGLE_BUMP
        };
        self.state.frustration = (self.state.frustration + bump).min(1.0);
    }

    pub fn on_emotional_feedback(&mut self, enjoyment: f64, frustration_signal: f64) {
        let signal = frustration_signal.clamp(0.0, 1.0);
        let mut frustration = 0.7 * self.state.frustration + 0.3 * signal;
        if enjoyment > 0.7 {
            frustration *= 0.8;
        }
        self.state.frustration = frustration.clamp(0.0, 1.0);
    }

    pub fn seconds_since_last_success(&self, now: DateTime<Utc>) -> Option<i64> {
        self.state
            .last_success
            .map(|t| (now - t).num_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ObservationInput;

    fn obs(success: bool) -> Observation {
        ObservationInput {
            learner_id: "l".to_string(),
            challenge_id: "c".to_string(),
            code: String::new(),
            success,
            error_output: None,
            stdout: None,
            tests_passed: 0,
            tests_total: 1,
            elapsed_seconds: 5.0,
            attempt_number: 1,
            concept_tags: vec![],
        }
        .into_observation()
    }

    #[test]
    fn success_builds_momentum_and_relieves_frustration() {
        let mut model = AffectModel::hydrate(AffectState {
            frustration: 0.5,
            momentum: 0.5,
            ..AffectState::default()
        });
        model.on_observation(&obs(true));
        let s = model.state();
        assert!((s.momentum - 0.6).abs() < 1e-9);
        assert!((s.frustration - 0.3).abs() < 1e-9);
        assert!(s.last_success.is_some());
        assert_eq!(s.first_try_successes, 1);
    }

    #[test]
    fn failure_bleeds_momentum_without_touching_frustration() {
        let mut model = AffectModel::hydrate(AffectState {
            frustration: 0.4,
            momentum: 0.5,
            ..AffectState::default()
        });
        model.on_observation(&obs(false));
        let s = model.state();
        assert!((s.momentum - 0.45).abs() < 1e-9);
        assert!((s.frustration - 0.4).abs() < 1e-9);
        assert_eq!(s.total_failures, 1);
    }

    #[test]
    fn scalars_clamp_to_unit_interval() {
        let mut model = AffectModel::hydrate(AffectState {
            frustration: 0.05,
            momentum: 0.98,
            ..AffectState::default()
        });
        model.on_observation(&obs(true));
        assert_eq!(model.state().momentum, 1.0);
        assert_eq!(model.state().frustration, 0.0);

        for _ in 0..30 {
            model.on_struggle_detected(5);
        }
        assert_eq!(model.state().frustration, 1.0);
    }

    #[test]
    fn emotional_feedback_blends_and_discounts_on_enjoyment() {
        let mut model = AffectModel::hydrate(AffectState {
            frustration: 0.5,
            ..AffectState::default()
        });
        model.on_emotional_feedback(0.2, 1.0);
        // 0.7 * 0.5 + 0.3 * 1.0
        assert!((model.state().frustration - 0.65).abs() < 1e-9);

        model.on_emotional_feedback(0.9, 1.0);
        // (0.7 * 0.65 + 0.3) * 0.8
        assert!((model.state().frustration - 0.604).abs() < 1e-9);
    }

    #[test]
    fn repeated_struggles_bump_harder() {
        let mut model = AffectModel::hydrate(AffectState::default());
        model.on_struggle_detected(1);
        assert!((model.state().frustration - 0.08).abs() < 1e-9);
        model.on_struggle_detected(3);
        assert!((model.state().frustration - 0.23).abs() < 1e-9);
    }
}
