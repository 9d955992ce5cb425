use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::text::truncate_chars;

/// Number of description characters that participate in the dedup key.
pub const KEY_DESCRIPTION_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StruggleKind {
    // Diagnostic-error group (first match wins)
    MissingColon,
    UnclosedBracket,
    InconsistentIndentation,
    IndentationError,
    AssignmentInCondition,
    SyntaxGeneral,
    RecursionLimit,
    ImportMissing,
    ZeroDivision,
    UnboundLocal,
    NoneTypeOperation,
    StringNumberConcat,
    TypeMismatch,
    NameUndefined,
    AttributeMissing,
    IndexOutOfRange,
    KeyMissing,
    ValueConversion,
    ExecutionTimeout,
    // Pattern-specific gotchas (independent, may co-occur)
    PrintVsReturn,
    MissingReturn,
    AccidentalNoneOutput,
    OperatorOrderTypo,
    StringVsIdentifier,
    EarlyReturnInLoop,
    RangeStartZero,
    ZeroBasedIndexing,
    OffByOne,
    MutableDefaultArg,
    ShadowedBuiltin,
    FloorDivision,
    // Default when a failure with partial passes matches no rule
    LogicError,
}

impl StruggleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StruggleKind::MissingColon => "missing_colon",
            StruggleKind::UnclosedBracket => "unclosed_bracket",
            StruggleKind::InconsistentIndentation => "inconsistent_indentation",
            StruggleKind::IndentationError => "indentation_error",
            StruggleKind::AssignmentInCondition => "assignment_in_condition",
            StruggleKind::SyntaxGeneral => "syntax_general",
            StruggleKind::RecursionLimit => "recursion_limit",
            StruggleKind::ImportMissing => "import_missing",
            StruggleKind::ZeroDivision => "zero_division",
            StruggleKind::UnboundLocal => "unbound_local",
            StruggleKind::NoneTypeOperation => "none_type_operation",
            StruggleKind::StringNumberConcat => "string_number_concat",
            StruggleKind::TypeMismatch => "type_mismatch",
            StruggleKind::NameUndefined => "name_undefined",
            StruggleKind::AttributeMissing => "attribute_missing",
            StruggleKind::IndexOutOfRange => "index_out_of_range",
            StruggleKind::KeyMissing => "key_missing",
            StruggleKind::ValueConversion => "value_conversion",
            StruggleKind::ExecutionTimeout => "execution_timeout",
            StruggleKind::PrintVsReturn => "print_vs_return",
            StruggleKind::MissingReturn => "missing_return",
            StruggleKind::AccidentalNoneOutput => "accidental_none_output",
            StruggleKind::OperatorOrderTypo => "operator_order_typo",
            StruggleKind::StringVsIdentifier => "string_vs_identifier",
            StruggleKind::EarlyReturnInLoop => "early_return_in_loop",
            StruggleKind::RangeStartZero => "range_start_zero",
            StruggleKind::ZeroBasedIndexing => "zero_based_indexing",
            StruggleKind::OffByOne => "off_by_one",
            StruggleKind::MutableDefaultArg => "mutable_default_arg",
            StruggleKind::ShadowedBuiltin => "shadowed_builtin",
            StruggleKind::FloorDivision => "floor_division",
            StruggleKind::LogicError => "logic_error",
        }
    }

    /// Gotcha patterns that indicate a conceptual gap rather than a slip;
    /// these feed the micro-challenge candidate list.
    pub fn is_concept_gap(&self) -> bool {
        matches!(
            self,
            StruggleKind::PrintVsReturn
                | StruggleKind::MissingReturn
                | StruggleKind::AccidentalNoneOutput
                | StruggleKind::OperatorOrderTypo
                | StruggleKind::StringVsIdentifier
                | StruggleKind::EarlyReturnInLoop
                | StruggleKind::RangeStartZero
                | StruggleKind::ZeroBasedIndexing
                | StruggleKind::OffByOne
                | StruggleKind::MutableDefaultArg
                | StruggleKind::ShadowedBuiltin
                | StruggleKind::FloorDivision
                | StruggleKind::NoneTypeOperation
        )
    }
}

impl std::fmt::Display for StruggleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classifier finding before the ledger has deduplicated it.
#[derive(Debug, Clone, PartialEq)]
pub struct StruggleCandidate {
    pub kind: StruggleKind,
    pub description: String,
    pub error_snippet: Option<String>,
    pub code_snippet: Option<String>,
}

impl StruggleCandidate {
    pub fn new(kind: StruggleKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            error_snippet: None,
            code_snippet: None,
        }
    }

    pub fn with_error(mut self, snippet: impl Into<String>) -> Self {
        self.error_snippet = Some(snippet.into());
        self
    }

    pub fn with_code(mut self, snippet: impl Into<String>) -> Self {
        self.code_snippet = Some(snippet.into());
        self
    }
}

/// A persistent, deduplicated struggle record. Keyed by
/// `(kind, description[..50])`; `resolved` flips once and never back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Struggle {
    pub kind: StruggleKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
    pub challenge_id: String,
    pub concept_tags: Vec<String>,
    pub frequency: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub resolved: bool,
}

impl Struggle {
    pub fn key(&self) -> StruggleKey {
        struggle_key(self.kind, &self.description)
    }

    /// Stable string form of the key, used as the persistence row id.
    pub fn storage_key(&self) -> String {
        let (kind, prefix) = self.key();
        format!("{}:{}", kind.as_str(), prefix)
    }
}

pub type StruggleKey = (StruggleKind, String);

pub fn struggle_key(kind: StruggleKind, description: &str) -> StruggleKey {
    (kind, truncate_chars(description, KEY_DESCRIPTION_CHARS))
}
