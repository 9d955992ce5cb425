use crate::models::Observation;

/// How many observations stay resident; older ones remain durable in the
/// store but fall out of the in-memory window cache.
const IN_MEMORY_CAP: usize = 200;

/// Append-only per-learner log of submission observations. Supplies the
/// trailing windows the recommendation layer computes over.
#[derive(Default)]
pub struct ObservationLog {
    entries: Vec<Observation>,
}

impl ObservationLog {
    pub fn hydrate(entries: Vec<Observation>) -> Self {
        let mut log = Self { entries };
        log.enforce_cap();
        log
    }

    pub fn push(&mut self, observation: Observation) {
        self.entries.push(observation);
        self.enforce_cap();
    }

    fn enforce_cap(&mut self) {
        if self.entries.len() > IN_MEMORY_CAP {
            let excess = self.entries.len() - IN_MEMORY_CAP;
            self.entries.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Observation] {
        &self.entries
    }

    /// The trailing `n` observations, oldest first.
    pub fn last_n(&self, n: usize) -> &[Observation] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Fraction of successful observations in a window; 0.0 for an empty one.
    pub fn success_rate(window: &[Observation]) -> f64 {
        if window.is_empty() {
            return 0.0;
        }
        let successes = window.iter().filter(|o| o.success).count();
        successes as f64 / window.len() as f64
    }

    /// Mean solve time across the successes in a window, if any succeeded.
    pub fn avg_success_seconds(window: &[Observation]) -> Option<f64> {
        let times: Vec<f64> = window
            .iter()
            .filter(|o| o.success)
            .map(|o| o.elapsed_seconds)
            .collect();
        if times.is_empty() {
            return None;
        }
        Some(times.iter().sum::<f64>() / times.len() as f64)
    }

    /// Mean elapsed time across every observation in a window.
    pub fn avg_elapsed_seconds(window: &[Observation]) -> Option<f64> {
        if window.is_empty() {
            return None;
        }
        let total: f64 = window.iter().map(|o| o.elapsed_seconds).sum();
        Some(total / window.len() as f64)
    }
}
