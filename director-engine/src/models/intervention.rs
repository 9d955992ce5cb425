use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    Hint,
    MicroLesson,
    Redirect,
    Encouragement,
    NewChallenge,
}

impl InterventionKind {
    /// Parse the wire form used by the generative backend payload.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "hint" => Some(InterventionKind::Hint),
            "micro_lesson" => Some(InterventionKind::MicroLesson),
            "redirect" => Some(InterventionKind::Redirect),
            "encouragement" => Some(InterventionKind::Encouragement),
            "new_challenge" => Some(InterventionKind::NewChallenge),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InterventionKind::Hint => "hint",
            InterventionKind::MicroLesson => "micro_lesson",
            InterventionKind::Redirect => "redirect",
            InterventionKind::Encouragement => "encouragement",
            InterventionKind::NewChallenge => "new_challenge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionSource {
    Generative,
    Catalog,
}

impl InterventionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterventionSource::Generative => "generative",
            InterventionSource::Catalog => "catalog",
        }
    }
}

/// A recommended help action. Derived on demand, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intervention {
    pub kind: InterventionKind,
    pub content: String,
    pub rationale: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_challenge: Option<serde_json::Value>,
    pub source: InterventionSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_wire_names() {
        assert_eq!(
            InterventionKind::parse("micro_lesson"),
            Some(InterventionKind::MicroLesson)
        );
        assert_eq!(InterventionKind::parse(" hint "), Some(InterventionKind::Hint));
        assert_eq!(InterventionKind::parse("lecture"), None);
    }
}
