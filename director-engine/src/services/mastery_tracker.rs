use std::collections::HashMap;

use crate::models::{Mastery, MasteryKind, Observation};

/// Per-concept and per-challenge success/failure bookkeeping. Every
/// observation fans out to the challenge id plus each concept tag it
/// carries; missing keys are lazily created zeroed.
#[derive(Default)]
pub struct MasteryTracker {
    entries: HashMap<String, Mastery>,
}

impl MasteryTracker {
    pub fn hydrate(entries: HashMap<String, Mastery>) -> Self {
        Self { entries }
    }

    /// Apply one observation to one key and return the updated row.
    pub fn record(&mut self, key: &str, kind: MasteryKind, observation: &Observation) -> &Mastery {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Mastery::new(kind));

        entry.last_attempt = Some(observation.timestamp);
        if observation.success {
            entry.successes += 1;
            entry.total_time_seconds += observation.elapsed_seconds;
            entry.fastest_seconds = Some(match entry.fastest_seconds {
                Some(fastest) => fastest.min(observation.elapsed_seconds),
                None => observation.elapsed_seconds,
            });
            entry.streak += 1;
            if observation.attempt_number == 1 {
                entry.first_try_successes += 1;
            }
        } else {
            entry.failures += 1;
            entry.streak = 0;
        }

        entry
    }

    /// Fan one observation out to its challenge id and every concept tag.
    /// Returns the touched keys so the caller can persist exactly those rows.
    pub fn record_observation(&mut self, observation: &Observation) -> Vec<String> {
        let mut touched = Vec::with_capacity(1 + observation.concept_tags.len());

        self.record(
            &observation.challenge_id,
            MasteryKind::Challenge,
            observation,
        );
        touched.push(observation.challenge_id.clone());

        for tag in &observation.concept_tags {
            self.record(tag, MasteryKind::Concept, observation);
            touched.push(tag.clone());
        }

        touched
    }

    pub fn get(&self, key: &str) -> Option<&Mastery> {
        self.entries.get(key)
    }

    pub fn score(&self, key: &str) -> f64 {
        self.entries.get(key).map(Mastery::score).unwrap_or(0.0)
    }

    pub fn entries(&self) -> &HashMap<String, Mastery> {
        &self.entries
    }

    fn concepts_where<F>(&self, predicate: F) -> Vec<String>
    where
        F: Fn(&Mastery) -> bool,
    {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, m)| m.kind == MasteryKind::Concept && predicate(m))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Concepts with score > 0.7.
    pub fn mastered_concepts(&self) -> Vec<String> {
        self.concepts_where(|m| m.score() > 0.7)
    }

    /// Concepts with score < 0.3 after at least two attempts.
    pub fn struggling_concepts(&self) -> Vec<String> {
        self.concepts_where(|m| m.attempts() >= 2 && m.score() < 0.3)
    }

    /// Concepts in the 0.2–0.5 "building" band.
    pub fn building_concepts(&self) -> Vec<String> {
        self.concepts_where(|m| {
            let score = m.score();
            (0.2..=0.5).contains(&score)
        })
    }
}
