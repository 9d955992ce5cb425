use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{struggle_key, Observation, Struggle, StruggleCandidate, StruggleKey};

/// Deduplicates classifier findings into persistent struggle records.
/// Repeat detections of the same `(kind, description)` key accumulate
/// frequency; resolution flips once, on the next related success, and
/// never flips back.
#[derive(Default)]
pub struct StruggleLedger {
    entries: HashMap<StruggleKey, Struggle>,
}

impl StruggleLedger {
    pub fn hydrate(rows: HashMap<String, Struggle>) -> Self {
        let entries = rows
            .into_values()
            .map(|s| (s.key(), s))
            .collect();
        Self { entries }
    }

    /// Record one failed observation's findings. Returns the touched
    /// records (with their post-update frequency) so the caller can feed
    /// the affect model and persist exactly those rows.
    pub fn record_all(
        &mut self,
        observation: &Observation,
        candidates: Vec<StruggleCandidate>,
    ) -> Vec<Struggle> {
        let now = observation.timestamp;
        let mut touched = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let key = struggle_key(candidate.kind, &candidate.description);
            let entry = self
                .entries
                .entry(key)
                .and_modify(|existing| {
                    existing.frequency += 1;
                    existing.last_seen = now;
                })
                .or_insert_with(|| Struggle {
                    kind: candidate.kind,
                    description: candidate.description,
                    error_snippet: candidate.error_snippet,
                    code_snippet: candidate.code_snippet,
                    challenge_id: observation.challenge_id.clone(),
                    concept_tags: observation.concept_tags.clone(),
                    frequency: 1,
                    first_seen: now,
                    last_seen: now,
                    resolved: false,
                });
            touched.push(entry.clone());
        }

        touched
    }

    /// On success, mark every unresolved struggle tied to the same
    /// challenge or sharing a concept tag as resolved. Idempotent:
    /// re-running after one success changes nothing.
    pub fn resolve_related(&mut self, observation: &Observation) -> Vec<Struggle> {
        let mut resolved = Vec::new();

        for entry in self.entries.values_mut() {
            if entry.resolved {
                continue;
            }
            let same_challenge = entry.challenge_id == observation.challenge_id;
            let shared_tag = entry
                .concept_tags
                .iter()
                .any(|tag| observation.concept_tags.contains(tag));
            if same_challenge || shared_tag {
                entry.resolved = true;
                resolved.push(entry.clone());
            }
        }

        if !resolved.is_empty() {
            tracing::info!(
                "Resolved {} struggle(s) after success on challenge={}",
                resolved.len(),
                observation.challenge_id
            );
        }

        resolved
    }

    /// Explicit resolution by key, for the caller-facing API.
    pub fn mark_resolved(&mut self, key: &StruggleKey) -> Option<Struggle> {
        let entry = self.entries.get_mut(key)?;
        entry.resolved = true;
        Some(entry.clone())
    }

    /// Recency-weighted worst unresolved struggle:
    /// `frequency * 1 / (1 + minutes_since_last_seen)`.
    pub fn worst_unresolved(&self, now: DateTime<Utc>) -> Option<&Struggle> {
        self.entries
            .values()
            .filter(|s| !s.resolved)
            .max_by(|a, b| {
                let score_a = Self::urgency(a, now);
                let score_b = Self::urgency(b, now);
                score_a
                    .partial_cmp(&score_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    fn urgency(struggle: &Struggle, now: DateTime<Utc>) -> f64 {
        let minutes = (now - struggle.last_seen).num_seconds().max(0) as f64 / 60.0;
        struggle.frequency as f64 / (1.0 + minutes)
    }

    pub fn unresolved_count(&self) -> usize {
        self.entries.values().filter(|s| !s.resolved).count()
    }

    pub fn resolved_count(&self) -> usize {
        self.entries.values().filter(|s| s.resolved).count()
    }

    pub fn max_unresolved_frequency(&self) -> u32 {
        self.entries
            .values()
            .filter(|s| !s.resolved)
            .map(|s| s.frequency)
            .max()
            .unwrap_or(0)
    }

    pub fn unresolved(&self) -> Vec<Struggle> {
        let mut rows: Vec<Struggle> = self
            .entries
            .values()
            .filter(|s| !s.resolved)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        rows
    }

    /// Descriptions of unresolved concept-gap struggles that have recurred
    /// at least `min_frequency` times; feeds the micro-challenge list.
    pub fn concept_gap_topics(&self, min_frequency: u32) -> Vec<String> {
        let mut topics: Vec<String> = self
            .entries
            .values()
            .filter(|s| !s.resolved && s.kind.is_concept_gap() && s.frequency >= min_frequency)
            .map(|s| s.description.clone())
            .collect();
        topics.sort();
        topics
    }
}
