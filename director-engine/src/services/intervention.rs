use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::config::DirectorConfig;
use crate::generative::GenerativeBackend;
use crate::metrics;
use crate::models::{
    AffectState, Intervention, InterventionKind, InterventionSource, Struggle,
};
use crate::services::struggle_ledger::StruggleLedger;
use crate::utils::text::snippet;

const PROMPT_SNIPPET_CHARS: usize = 300;

const SYSTEM_INSTRUCTIONS: &str = "You are a patient programming tutor inside a coding game. \
Respond with a single JSON object containing: intervention_type (one of hint, micro_lesson, \
redirect, encouragement, new_challenge), content (what to show the learner), reason (one \
sentence of tutor rationale), confidence (number between 0 and 1), and optionally \
new_challenge (an object describing a practice exercise). Do not reveal full solutions.";

/// Decides whether to intervene, and what to offer. Pure over current
/// state: no events are consumed, so callers may re-evaluate at will.
pub struct InterventionPolicy {
    config: DirectorConfig,
    backend: Option<Arc<dyn GenerativeBackend>>,
}

impl InterventionPolicy {
    pub fn new(config: DirectorConfig, backend: Option<Arc<dyn GenerativeBackend>>) -> Self {
        Self { config, backend }
    }

    /// True once any of the three pressure signals crosses its threshold:
    /// frustration, struggle recurrence, or time since the last success.
    pub fn should_intervene(
        &self,
        affect: &AffectState,
        ledger: &StruggleLedger,
        now: DateTime<Utc>,
    ) -> bool {
        if affect.frustration >= self.config.frustration_threshold {
            return true;
        }
        if ledger.max_unresolved_frequency() >= self.config.struggle_frequency_threshold {
            return true;
        }
        if let Some(last) = affect.last_success {
            if (now - last).num_seconds() > self.config.stall_seconds {
                return true;
            }
        }
        false
    }

    pub async fn get_intervention(
        &self,
        affect: &AffectState,
        ledger: &StruggleLedger,
        now: DateTime<Utc>,
    ) -> Option<Intervention> {
        if !self.should_intervene(affect, ledger, now) {
            return None;
        }

        let worst = match ledger.worst_unresolved(now) {
            Some(struggle) => struggle,
            None => {
                // Pressure without a classified cause: cheer, don't teach
                return Some(encouragement(0.6));
            }
        };

        if let Some(backend) = &self.backend {
            match self.generate(backend.as_ref(), worst, affect).await {
                Ok(intervention) => return Some(intervention),
                Err(e) => {
                    metrics::GENERATIVE_FALLBACKS_TOTAL.inc();
                    tracing::warn!(
                        "Generative intervention failed for struggle={}: {:#}. Falling back to catalog.",
                        worst.kind,
                        e
                    );
                }
            }
        }

        Some(catalog_intervention(worst))
    }

    async fn generate(
        &self,
        backend: &dyn GenerativeBackend,
        struggle: &Struggle,
        affect: &AffectState,
    ) -> Result<Intervention> {
        let prompt = build_prompt(struggle, affect);
        let deadline = Duration::from_secs(self.config.generative_timeout_secs);

        let raw = tokio::time::timeout(deadline, backend.generate(&prompt, SYSTEM_INSTRUCTIONS))
            .await
            .context("Generative backend timed out")??;

        parse_generated(&raw)
    }
}

fn build_prompt(struggle: &Struggle, affect: &AffectState) -> String {
    let mut prompt = format!(
        "The learner keeps hitting the same problem: {} (seen {} times, pattern: {}).\n",
        struggle.description, struggle.frequency, struggle.kind
    );
    if let Some(code) = &struggle.code_snippet {
        prompt.push_str(&format!("Their code: {}\n", snippet(code, PROMPT_SNIPPET_CHARS)));
    }
    if let Some(error) = &struggle.error_snippet {
        prompt.push_str(&format!("The error: {}\n", snippet(error, PROMPT_SNIPPET_CHARS)));
    }
    prompt.push_str(&format!(
        "Current state: frustration {:.2}, momentum {:.2}, {} successes / {} failures overall.\n\
         Choose the lightest intervention that will unstick them.",
        affect.frustration, affect.momentum, affect.total_successes, affect.total_failures
    ));
    prompt
}

/// Validate a generative response before trusting it. Required fields
/// missing, an unknown kind, or a non-numeric/out-of-range confidence all
/// count as failures and route to the catalog fallback.
fn parse_generated(raw: &str) -> Result<Intervention> {
    let trimmed = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let value: serde_json::Value =
        serde_json::from_str(trimmed).context("Generative response is not valid JSON")?;

    let kind = value
        .get("intervention_type")
        .and_then(|v| v.as_str())
        .and_then(InterventionKind::parse)
        .ok_or_else(|| anyhow::anyhow!("Missing or unknown intervention_type"))?;

    let content = value
        .get("content")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing or empty content"))?
        .to_string();

    let confidence = value
        .get("confidence")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| anyhow::anyhow!("Missing or non-numeric confidence"))?;
    if !(0.0..=1.0).contains(&confidence) {
        anyhow::bail!("Confidence {} outside [0, 1]", confidence);
    }

    let rationale = value
        .get("reason")
        .and_then(|v| v.as_str())
        .unwrap_or("Generated by the tutoring backend")
        .to_string();

    let generated_challenge = value.get("new_challenge").filter(|v| !v.is_null()).cloned();

    Ok(Intervention {
        kind,
        content,
        rationale,
        confidence,
        generated_challenge,
        source: InterventionSource::Generative,
    })
}

fn encouragement(confidence: f64) -> Intervention {
    Intervention {
        kind: InterventionKind::Encouragement,
        content: "Tough stretch. Take a breath and look at the problem once more; you are \
                  closer than the output makes it feel."
            .to_string(),
        rationale: "Pressure is up but no single recurring cause stands out".to_string(),
        confidence,
        generated_challenge: None,
        source: InterventionSource::Catalog,
    }
}

/// Static rule catalog keyed by struggle kind. Kinds with no entry get the
/// generic encouragement at reduced confidence.
fn catalog_intervention(struggle: &Struggle) -> Intervention {
    use crate::models::StruggleKind as K;

    let (kind, content, confidence) = match struggle.kind {
        K::PrintVsReturn => (
            InterventionKind::Hint,
            "print() shows a value but hands back None. If the checker needs the value, \
             return it; print only for display.",
            0.85,
        ),
        K::MissingReturn => (
            InterventionKind::Hint,
            "The function computes the answer but never hands it back. Add a return for \
             the value the caller expects.",
            0.8,
        ),
        K::AccidentalNoneOutput => (
            InterventionKind::Hint,
            "A bare None in the output usually means a function without a return was \
             printed. Check what each printed call returns.",
            0.75,
        ),
        K::OperatorOrderTypo => (
            InterventionKind::Hint,
            "'x =- y' assigns negative y to x. To subtract in place, the operator comes \
             first: 'x -= y'.",
            0.9,
        ),
        K::StringVsIdentifier => (
            InterventionKind::Hint,
            "Without quotes you are comparing against the function itself, not its name. \
             Compare to the quoted string instead.",
            0.85,
        ),
        K::EarlyReturnInLoop => (
            InterventionKind::Hint,
            "A return inside the loop body ends the whole function on iteration one. \
             Collect results first; return after the loop.",
            0.85,
        ),
        K::RangeStartZero => (
            InterventionKind::MicroLesson,
            "range(n) yields 0 through n-1. To count 1 through n, use range(1, n + 1).",
            0.85,
        ),
        K::ZeroBasedIndexing => (
            InterventionKind::MicroLesson,
            "Sequences start at index 0: items[0] is the first element and items[len-1] \
             the last.",
            0.8,
        ),
        K::OffByOne => (
            InterventionKind::Hint,
            "The answer is one away from expected. Check the loop bounds: where does it \
             start, and is the end inclusive?",
            0.7,
        ),
        K::MutableDefaultArg => (
            InterventionKind::MicroLesson,
            "Default arguments are created once, so a default list is shared across \
             calls. Use None as the default and create the list inside.",
            0.85,
        ),
        K::ShadowedBuiltin => (
            InterventionKind::Hint,
            "Assigning to a builtin name hides the original for the rest of the program. \
             Pick a different variable name.",
            0.8,
        ),
        K::IndentationError | K::InconsistentIndentation => (
            InterventionKind::Hint,
            "Python reads structure from indentation. Align each block consistently and \
             stick to spaces.",
            0.75,
        ),
        K::MissingColon => (
            InterventionKind::Hint,
            "Headers like if, for and def need a colon at the end of the line before the \
             indented block starts.",
            0.8,
        ),
        K::NameUndefined => (
            InterventionKind::Hint,
            "That name has no value yet at the point it is used. Define it first, and \
             watch for typos in the spelling.",
            0.75,
        ),
        K::TypeMismatch | K::StringNumberConcat => (
            InterventionKind::Hint,
            "The two sides of that operation are different types. Convert one side \
             explicitly, e.g. str(number) or int(text).",
            0.7,
        ),
        K::NoneTypeOperation => (
            InterventionKind::Hint,
            "Something in that expression is None. Trace where the value comes from; a \
             function without a return is the usual source.",
            0.75,
        ),
        K::IndexOutOfRange => (
            InterventionKind::MicroLesson,
            "Valid indexes run from 0 to len-1. Guard the access or check the loop \
             bounds before indexing.",
            0.75,
        ),
        K::KeyMissing => (
            InterventionKind::Hint,
            "That key is not in the dictionary yet. Use 'key in d' or d.get(key) before \
             reading it.",
            0.75,
        ),
        K::ExecutionTimeout => (
            InterventionKind::Hint,
            "The program never finished, which points at a loop whose condition never \
             turns false. Check what changes inside the loop.",
            0.8,
        ),
        K::ZeroDivision => (
            InterventionKind::Hint,
            "Some input drives that divisor to zero. Guard the division or rethink the \
             formula for that case.",
            0.75,
        ),
        K::RecursionLimit => (
            InterventionKind::Hint,
            "The recursion never hits a base case. Make sure some condition returns \
             without another recursive call.",
            0.8,
        ),
        K::LogicError => (
            InterventionKind::Redirect,
            "The code runs, but part of the expected behavior is missing. Re-read the \
             task statement and compare it case by case with your output.",
            0.6,
        ),
        _ => {
            return Intervention {
                kind: InterventionKind::Encouragement,
                content: "Keep at it: this one is close. Re-read the error message slowly; \
                          it names the exact line to look at."
                    .to_string(),
                rationale: format!("No catalog entry for recurring pattern {}", struggle.kind),
                confidence: 0.4,
                generated_challenge: None,
                source: InterventionSource::Catalog,
            }
        }
    };

    Intervention {
        kind,
        content: content.to_string(),
        rationale: format!(
            "Pattern {} has recurred {} times without being resolved",
            struggle.kind, struggle.frequency
        ),
        confidence,
        generated_challenge: None,
        source: InterventionSource::Catalog,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ObservationInput, StruggleCandidate, StruggleKind};

    fn ledger_with(kind: StruggleKind, description: &str, repeats: usize) -> StruggleLedger {
        let mut ledger = StruggleLedger::default();
        let obs = ObservationInput {
            learner_id: "l".to_string(),
            challenge_id: "c".to_string(),
            code: String::new(),
            success: false,
            error_output: None,
            stdout: None,
            tests_passed: 0,
            tests_total: 1,
            elapsed_seconds: 5.0,
            attempt_number: 1,
            concept_tags: vec![],
        }
        .into_observation();
        for _ in 0..repeats {
            ledger.record_all(&obs, vec![StruggleCandidate::new(kind, description)]);
        }
        ledger
    }

    fn policy() -> InterventionPolicy {
        InterventionPolicy::new(DirectorConfig::default(), None)
    }

    #[test]
    fn frustration_alone_triggers() {
        let affect = AffectState {
            frustration: 0.7,
            ..AffectState::default()
        };
        assert!(policy().should_intervene(&affect, &StruggleLedger::default(), Utc::now()));
    }

    #[test]
    fn struggle_frequency_alone_triggers() {
        let ledger = ledger_with(StruggleKind::OffByOne, "off by one", 3);
        assert!(policy().should_intervene(&AffectState::default(), &ledger, Utc::now()));
    }

    #[test]
    fn stall_since_last_success_triggers() {
        let affect = AffectState {
            last_success: Some(Utc::now() - chrono::Duration::seconds(301)),
            ..AffectState::default()
        };
        assert!(policy().should_intervene(&affect, &StruggleLedger::default(), Utc::now()));
    }

    #[test]
    fn calm_state_does_not_trigger() {
        let affect = AffectState {
            frustration: 0.69,
            last_success: Some(Utc::now()),
            ..AffectState::default()
        };
        let ledger = ledger_with(StruggleKind::OffByOne, "off by one", 2);
        assert!(!policy().should_intervene(&affect, &ledger, Utc::now()));
    }

    #[tokio::test]
    async fn no_intervention_below_thresholds() {
        let result = policy()
            .get_intervention(&AffectState::default(), &StruggleLedger::default(), Utc::now())
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn pressure_without_struggles_yields_encouragement() {
        let affect = AffectState {
            frustration: 0.9,
            ..AffectState::default()
        };
        let iv = policy()
            .get_intervention(&affect, &StruggleLedger::default(), Utc::now())
            .await
            .unwrap();
        assert_eq!(iv.kind, InterventionKind::Encouragement);
        assert_eq!(iv.confidence, 0.6);
    }

    #[tokio::test]
    async fn catalog_lookup_by_struggle_kind() {
        let ledger = ledger_with(StruggleKind::PrintVsReturn, "returning print()", 3);
        let iv = policy()
            .get_intervention(&AffectState::default(), &ledger, Utc::now())
            .await
            .unwrap();
        assert_eq!(iv.kind, InterventionKind::Hint);
        assert_eq!(iv.source, InterventionSource::Catalog);
        assert!(iv.content.contains("None"));
    }

    #[test]
    fn uncatalogued_kind_falls_back_to_low_confidence_encouragement() {
        let ledger = ledger_with(StruggleKind::ImportMissing, "module gone", 1);
        let worst = ledger.worst_unresolved(Utc::now()).unwrap();
        let iv = catalog_intervention(worst);
        assert_eq!(iv.kind, InterventionKind::Encouragement);
        assert_eq!(iv.confidence, 0.4);
    }

    #[test]
    fn generated_payload_is_validated() {
        let ok = parse_generated(
            r#"{"intervention_type": "hint", "content": "look here", "reason": "why", "confidence": 0.8}"#,
        )
        .unwrap();
        assert_eq!(ok.kind, InterventionKind::Hint);
        assert_eq!(ok.source, InterventionSource::Generative);

        assert!(parse_generated("not json").is_err());
        assert!(parse_generated(r#"{"intervention_type": "lecture", "content": "x", "confidence": 0.5}"#).is_err());
        assert!(parse_generated(r#"{"intervention_type": "hint", "content": "", "confidence": 0.5}"#).is_err());
        assert!(parse_generated(r#"{"intervention_type": "hint", "content": "x", "confidence": "high"}"#).is_err());
        assert!(parse_generated(r#"{"intervention_type": "hint", "content": "x", "confidence": 1.5}"#).is_err());
    }

    #[test]
    fn generated_payload_tolerates_code_fences() {
        let iv = parse_generated(
            "```json\n{\"intervention_type\": \"micro_lesson\", \"content\": \"short lesson\", \"confidence\": 0.7}\n```",
        )
        .unwrap();
        assert_eq!(iv.kind, InterventionKind::MicroLesson);
    }
}
