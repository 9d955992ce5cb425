use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{Observation, StruggleCandidate, StruggleKind};
use crate::utils::text::{first_line, snippet};

const ERROR_SNIPPET_CHARS: usize = 120;
const CODE_SNIPPET_CHARS: usize = 120;

lazy_static! {
    static ref RE_NAME_UNDEFINED: Regex = Regex::new(r"name '([^']+)' is not defined").unwrap();
    static ref RE_UNBOUND_LOCAL: Regex = Regex::new(r"local variable '([^']+)'").unwrap();
    static ref RE_ATTRIBUTE: Regex =
        Regex::new(r"'([^']+)' object has no attribute '([^']+)'").unwrap();
    static ref RE_NO_MODULE: Regex = Regex::new(r"no module named '?([a-z0-9_.]+)'?").unwrap();
    static ref RE_RETURN_PRINT: Regex = Regex::new(r"return\s+print\s*\(").unwrap();
    static ref RE_OP_ORDER: Regex =
        Regex::new(r"(?:^|[^=!<>+\-*/%&|^])=([+-])\s*[A-Za-z_0-9(]").unwrap();
    static ref RE_EQ_IDENT: Regex = Regex::new(r"==\s*([A-Za-z_]\w*)").unwrap();
    static ref RE_SINGLE_ARG_RANGE: Regex = Regex::new(r"range\s*\(\s*([^,()]+?)\s*\)").unwrap();
    static ref RE_MUTABLE_DEFAULT: Regex =
        Regex::new(r"def\s+\w+\s*\([^)]*=\s*(\[\]|\{\})").unwrap();
    static ref RE_SHADOWED_BUILTIN: Regex = Regex::new(
        r"(?m)^\s*(list|dict|str|int|float|sum|max|min|len|input|print|type|range|set)\s*=[^=]"
    )
    .unwrap();
    static ref RE_EXPECTED_GOT: Regex =
        Regex::new(r"expected\D{0,24}?(\d+)\D{0,24}?got\D{0,8}?(\d+)").unwrap();
    static ref RE_DECIMAL: Regex = Regex::new(r"\d+\.\d+").unwrap();
}

/// What one rule sees: the immutable observation, the lower-cased
/// error+stdout text, and the raw code.
pub struct RuleInput<'a> {
    pub observation: &'a Observation,
    pub diagnostics: &'a str,
    pub code: &'a str,
}

impl<'a> RuleInput<'a> {
    fn error_evidence(&self) -> Option<String> {
        self.observation
            .error_output
            .as_deref()
            .and_then(|e| first_line(e, ERROR_SNIPPET_CHARS))
    }
}

type RuleFn = fn(&RuleInput) -> Option<StruggleCandidate>;

pub struct Rule {
    pub name: &'static str,
    pub matches: RuleFn,
}

/// Diagnostic-error rules, most specific first. Only the first match in
/// this group is reported: a submission with a SyntaxError and a latent
/// type problem reads as a syntax struggle until it parses.
pub const DIAGNOSTIC_RULES: &[Rule] = &[
    Rule { name: "missing_colon", matches: missing_colon },
    Rule { name: "unclosed_bracket", matches: unclosed_bracket },
    Rule { name: "inconsistent_indentation", matches: inconsistent_indentation },
    Rule { name: "indentation_error", matches: indentation_error },
    Rule { name: "assignment_in_condition", matches: assignment_in_condition },
    Rule { name: "syntax_general", matches: syntax_general },
    Rule { name: "recursion_limit", matches: recursion_limit },
    Rule { name: "import_missing", matches: import_missing },
    Rule { name: "zero_division", matches: zero_division },
    Rule { name: "unbound_local", matches: unbound_local },
    Rule { name: "none_type_operation", matches: none_type_operation },
    Rule { name: "string_number_concat", matches: string_number_concat },
    Rule { name: "type_mismatch", matches: type_mismatch },
    Rule { name: "name_undefined", matches: name_undefined },
    Rule { name: "attribute_missing", matches: attribute_missing },
    Rule { name: "index_out_of_range", matches: index_out_of_range },
    Rule { name: "key_missing", matches: key_missing },
    Rule { name: "value_conversion", matches: value_conversion },
    Rule { name: "execution_timeout", matches: execution_timeout },
];

/// Pattern-specific gotcha rules. Independent: each may fire alongside the
/// diagnostic finding and alongside each other.
pub const PATTERN_RULES: &[Rule] = &[
    Rule { name: "print_vs_return", matches: print_vs_return },
    Rule { name: "missing_return", matches: missing_return },
    Rule { name: "accidental_none_output", matches: accidental_none_output },
    Rule { name: "operator_order_typo", matches: operator_order_typo },
    Rule { name: "string_vs_identifier", matches: string_vs_identifier },
    Rule { name: "early_return_in_loop", matches: early_return_in_loop },
    Rule { name: "range_start_zero", matches: range_start_zero },
    Rule { name: "zero_based_indexing", matches: zero_based_indexing },
    Rule { name: "off_by_one", matches: off_by_one },
    Rule { name: "mutable_default_arg", matches: mutable_default_arg },
    Rule { name: "shadowed_builtin", matches: shadowed_builtin },
    Rule { name: "floor_division", matches: floor_division },
];

/// Stateless mapping from one failed observation to zero or more struggle
/// candidates. Never raises: malformed or partial text degrades to
/// no-match, and a successful observation always classifies to nothing.
pub struct StruggleClassifier;

impl StruggleClassifier {
    pub fn classify(observation: &Observation) -> Vec<StruggleCandidate> {
        if observation.success {
            return Vec::new();
        }

        let diagnostics = observation.diagnostic_text();
        let input = RuleInput {
            observation,
            diagnostics: &diagnostics,
            code: &observation.code,
        };

        let mut findings = Vec::new();

        for rule in DIAGNOSTIC_RULES {
            if let Some(found) = (rule.matches)(&input) {
                tracing::debug!(
                    "Classifier rule {} matched on challenge={}",
                    rule.name,
                    observation.challenge_id
                );
                findings.push(found);
                break;
            }
        }

        for rule in PATTERN_RULES {
            if let Some(found) = (rule.matches)(&input) {
                tracing::debug!(
                    "Classifier rule {} matched on challenge={}",
                    rule.name,
                    observation.challenge_id
                );
                findings.push(found);
            }
        }

        if findings.is_empty() && observation.had_partial_passes() {
            findings.push(
                StruggleCandidate::new(
                    StruggleKind::LogicError,
                    format!(
                        "Logic gap on {}: some tests pass, others fail",
                        observation.challenge_id
                    ),
                )
                .with_code(snippet(&observation.code, CODE_SNIPPET_CHARS)),
            );
        }

        findings
    }
}

// ---- diagnostic-error group ----

fn missing_colon(input: &RuleInput) -> Option<StruggleCandidate> {
    if !input.diagnostics.contains("expected ':'") {
        return None;
    }
    let mut candidate =
        StruggleCandidate::new(StruggleKind::MissingColon, "Block header missing its trailing colon");
    if let Some(evidence) = input.error_evidence() {
        candidate = candidate.with_error(evidence);
    }
    Some(candidate)
}

fn unclosed_bracket(input: &RuleInput) -> Option<StruggleCandidate> {
    let hit = input.diagnostics.contains("was never closed")
        || input.diagnostics.contains("unexpected eof")
        || input.diagnostics.contains("unterminated string");
    if !hit {
        return None;
    }
    let mut candidate = StruggleCandidate::new(
        StruggleKind::UnclosedBracket,
        "Bracket or quote opened but never closed",
    );
    if let Some(evidence) = input.error_evidence() {
        candidate = candidate.with_error(evidence);
    }
    Some(candidate)
}

fn inconsistent_indentation(input: &RuleInput) -> Option<StruggleCandidate> {
    if !input.diagnostics.contains("inconsistent use of tabs") {
        return None;
    }
    Some(StruggleCandidate::new(
        StruggleKind::InconsistentIndentation,
        "Mixed tabs and spaces in indentation",
    ))
}

fn indentation_error(input: &RuleInput) -> Option<StruggleCandidate> {
    let hit = input.diagnostics.contains("indentationerror")
        || input.diagnostics.contains("unexpected indent")
        || input.diagnostics.contains("expected an indented block");
    if !hit {
        return None;
    }
    let mut candidate = StruggleCandidate::new(
        StruggleKind::IndentationError,
        "Indentation does not match the block structure",
    );
    if let Some(evidence) = input.error_evidence() {
        candidate = candidate.with_error(evidence);
    }
    Some(candidate)
}

fn assignment_in_condition(input: &RuleInput) -> Option<StruggleCandidate> {
    let hit = input.diagnostics.contains("maybe you meant '=='")
        || input.diagnostics.contains("cannot assign to");
    if !hit {
        return None;
    }
    Some(StruggleCandidate::new(
        StruggleKind::AssignmentInCondition,
        "Single = used where a comparison needs ==",
    ))
}

fn syntax_general(input: &RuleInput) -> Option<StruggleCandidate> {
    if !input.diagnostics.contains("syntaxerror") {
        return None;
    }
    let detail = input
        .error_evidence()
        .unwrap_or_else(|| "invalid syntax".to_string());
    Some(
        StruggleCandidate::new(
            StruggleKind::SyntaxGeneral,
            format!("Syntax error: {}", snippet(&detail, 60)),
        )
        .with_error(detail),
    )
}

fn recursion_limit(input: &RuleInput) -> Option<StruggleCandidate> {
    let hit = input.diagnostics.contains("recursionerror")
        || input.diagnostics.contains("maximum recursion depth");
    if !hit {
        return None;
    }
    Some(StruggleCandidate::new(
        StruggleKind::RecursionLimit,
        "Recursion never reaches a base case",
    ))
}

fn import_missing(input: &RuleInput) -> Option<StruggleCandidate> {
    let hit = input.diagnostics.contains("modulenotfounderror")
        || input.diagnostics.contains("importerror")
        || input.diagnostics.contains("no module named");
    if !hit {
        return None;
    }
    let description = match RE_NO_MODULE
        .captures(input.diagnostics)
        .and_then(|caps| caps.get(1))
    {
        Some(module) => format!("Importing module '{}' that is not available", module.as_str()),
        None => "Importing a module that is not available".to_string(),
    };
    Some(StruggleCandidate::new(StruggleKind::ImportMissing, description))
}

fn zero_division(input: &RuleInput) -> Option<StruggleCandidate> {
    let hit = input.diagnostics.contains("zerodivisionerror")
        || input.diagnostics.contains("division by zero");
    if !hit {
        return None;
    }
    Some(StruggleCandidate::new(
        StruggleKind::ZeroDivision,
        "Division by zero at runtime",
    ))
}

fn unbound_local(input: &RuleInput) -> Option<StruggleCandidate> {
    let hit = input.diagnostics.contains("unboundlocalerror")
        || input.diagnostics.contains("referenced before assignment");
    if !hit {
        return None;
    }
    let description = match RE_UNBOUND_LOCAL
        .captures(input.diagnostics)
        .and_then(|caps| caps.get(1))
    {
        Some(name) => format!(
            "Variable '{}' read before assignment inside the function",
            name.as_str()
        ),
        None => "Variable read before assignment inside the function".to_string(),
    };
    Some(StruggleCandidate::new(StruggleKind::UnboundLocal, description))
}

fn none_type_operation(input: &RuleInput) -> Option<StruggleCandidate> {
    if !input.diagnostics.contains("'nonetype'") {
        return None;
    }
    let mut candidate = StruggleCandidate::new(
        StruggleKind::NoneTypeOperation,
        "Operating on None as if it were a value",
    );
    if let Some(evidence) = input.error_evidence() {
        candidate = candidate.with_error(evidence);
    }
    Some(candidate)
}

fn string_number_concat(input: &RuleInput) -> Option<StruggleCandidate> {
    let hit = input.diagnostics.contains("can only concatenate str")
        || input.diagnostics.contains("must be str, not int");
    if !hit {
        return None;
    }
    Some(StruggleCandidate::new(
        StruggleKind::StringNumberConcat,
        "Concatenating text and numbers without conversion",
    ))
}

fn type_mismatch(input: &RuleInput) -> Option<StruggleCandidate> {
    if !input.diagnostics.contains("typeerror") {
        return None;
    }
    let mut candidate = StruggleCandidate::new(
        StruggleKind::TypeMismatch,
        "Operation applied to incompatible types",
    );
    if let Some(evidence) = input.error_evidence() {
        candidate = candidate.with_error(evidence);
    }
    Some(candidate)
}

fn name_undefined(input: &RuleInput) -> Option<StruggleCandidate> {
    let hit = input.diagnostics.contains("nameerror")
        || input.diagnostics.contains("is not defined");
    if !hit {
        return None;
    }
    let description = match RE_NAME_UNDEFINED
        .captures(input.diagnostics)
        .and_then(|caps| caps.get(1))
    {
        Some(name) => format!("Using name '{}' before defining it", name.as_str()),
        None => "Using a name before defining it".to_string(),
    };
    Some(StruggleCandidate::new(StruggleKind::NameUndefined, description))
}

fn attribute_missing(input: &RuleInput) -> Option<StruggleCandidate> {
    if !input.diagnostics.contains("attributeerror") {
        return None;
    }
    let description = match RE_ATTRIBUTE.captures(input.diagnostics) {
        Some(caps) => format!(
            "Accessing missing attribute '{}' on a {} value",
            &caps[2], &caps[1]
        ),
        None => "Accessing an attribute the value does not have".to_string(),
    };
    Some(StruggleCandidate::new(StruggleKind::AttributeMissing, description))
}

fn index_out_of_range(input: &RuleInput) -> Option<StruggleCandidate> {
    let hit = input.diagnostics.contains("indexerror")
        || input.diagnostics.contains("index out of range");
    if !hit {
        return None;
    }
    Some(StruggleCandidate::new(
        StruggleKind::IndexOutOfRange,
        "Indexing past the end of a sequence",
    ))
}

fn key_missing(input: &RuleInput) -> Option<StruggleCandidate> {
    if !input.diagnostics.contains("keyerror") {
        return None;
    }
    Some(StruggleCandidate::new(
        StruggleKind::KeyMissing,
        "Looking up a dictionary key that does not exist",
    ))
}

fn value_conversion(input: &RuleInput) -> Option<StruggleCandidate> {
    if !input.diagnostics.contains("valueerror") {
        return None;
    }
    Some(StruggleCandidate::new(
        StruggleKind::ValueConversion,
        "Converting a value to a type it does not fit",
    ))
}

fn execution_timeout(input: &RuleInput) -> Option<StruggleCandidate> {
    let hit = input.diagnostics.contains("timed out")
        || input.diagnostics.contains("time limit exceeded");
    if !hit {
        return None;
    }
    Some(StruggleCandidate::new(
        StruggleKind::ExecutionTimeout,
        "Code ran past the time limit, likely an infinite loop",
    ))
}

// ---- pattern-specific gotchas ----

fn print_vs_return(input: &RuleInput) -> Option<StruggleCandidate> {
    if RE_RETURN_PRINT.is_match(input.code) {
        return Some(
            StruggleCandidate::new(
                StruggleKind::PrintVsReturn,
                "Returning the result of print(), which is always None",
            )
            .with_code(snippet(
                RE_RETURN_PRINT.find(input.code).map(|m| m.as_str()).unwrap_or("return print("),
                CODE_SNIPPET_CHARS,
            )),
        );
    }
    if input.code.contains("print(")
        && !input.code.contains("return")
        && input.diagnostics.contains("none")
    {
        return Some(StruggleCandidate::new(
            StruggleKind::PrintVsReturn,
            "Printing the result instead of returning it",
        ));
    }
    None
}

fn missing_return(input: &RuleInput) -> Option<StruggleCandidate> {
    let has_function = input.code.contains("def ");
    if !has_function
        || input.code.contains("return")
        || input.code.contains("print(")
        || !input.diagnostics.contains("none")
    {
        return None;
    }
    Some(StruggleCandidate::new(
        StruggleKind::MissingReturn,
        "Function computes a value but never returns it",
    ))
}

fn accidental_none_output(input: &RuleInput) -> Option<StruggleCandidate> {
    let stdout = input.observation.stdout.as_deref()?;
    let has_bare_none = stdout
        .lines()
        .any(|line| line.trim().eq_ignore_ascii_case("none"));
    if !has_bare_none {
        return None;
    }
    Some(StruggleCandidate::new(
        StruggleKind::AccidentalNoneOutput,
        "Output contains a stray None, usually a missing return value",
    ))
}

fn operator_order_typo(input: &RuleInput) -> Option<StruggleCandidate> {
    let caps = RE_OP_ORDER.captures(input.code)?;
    let sign = &caps[1];
    // A real compound assignment elsewhere means the learner knows the form
    let compound = format!("{}=", sign);
    if input.code.contains(&compound) {
        return None;
    }
    let description = if sign == "-" {
        "'=-' assigns a negated value; '-=' subtracts in place"
    } else {
        "'=+' assigns the value unchanged; '+=' adds in place"
    };
    Some(
        StruggleCandidate::new(StruggleKind::OperatorOrderTypo, description)
            .with_code(snippet(caps.get(0).map(|m| m.as_str()).unwrap_or(""), CODE_SNIPPET_CHARS)),
    )
}

fn string_vs_identifier(input: &RuleInput) -> Option<StruggleCandidate> {
    for caps in RE_EQ_IDENT.captures_iter(input.code) {
        let ident_match = caps.get(1)?;
        let ident = ident_match.as_str();
        if matches!(ident, "True" | "False" | "None") {
            continue;
        }
        // A call or member access on the right-hand side is a value compare
        let rest = input.code[ident_match.end()..].trim_start();
        if rest.starts_with('(') || rest.starts_with('.') || rest.starts_with('[') {
            continue;
        }
        let defined = input.code.contains(&format!("def {}(", ident))
            || input.code.contains(&format!("def {} (", ident));
        if defined {
            return Some(
                StruggleCandidate::new(
                    StruggleKind::StringVsIdentifier,
                    format!(
                        "Comparing against bare name '{}' instead of the string \"{}\"",
                        ident, ident
                    ),
                )
                .with_code(snippet(caps.get(0).map(|m| m.as_str()).unwrap_or(""), CODE_SNIPPET_CHARS)),
            );
        }
    }
    None
}

fn early_return_in_loop(input: &RuleInput) -> Option<StruggleCandidate> {
    if !return_inside_loop(input.code) {
        return None;
    }
    let truncation_symptom = input.diagnostics.contains("only")
        || input.diagnostics.contains("first")
        || input.observation.had_partial_passes();
    if !truncation_symptom {
        return None;
    }
    Some(StruggleCandidate::new(
        StruggleKind::EarlyReturnInLoop,
        "return inside the loop body exits on the first iteration",
    ))
}

fn zero_start_symptom(diagnostics: &str) -> bool {
    diagnostics.contains("starts with 0")
        || diagnostics.contains("starts at 0")
        || diagnostics.contains("started at 0")
        || diagnostics.contains("first number is 0")
}

fn range_start_zero(input: &RuleInput) -> Option<StruggleCandidate> {
    if !RE_SINGLE_ARG_RANGE.is_match(input.code) || !zero_start_symptom(input.diagnostics) {
        return None;
    }
    Some(
        StruggleCandidate::new(
            StruggleKind::RangeStartZero,
            "range(n) starts counting at 0, not 1",
        )
        .with_code(snippet(
            RE_SINGLE_ARG_RANGE.find(input.code).map(|m| m.as_str()).unwrap_or("range(n)"),
            CODE_SNIPPET_CHARS,
        )),
    )
}

fn zero_based_indexing(input: &RuleInput) -> Option<StruggleCandidate> {
    if RE_SINGLE_ARG_RANGE.is_match(input.code) {
        return None; // the range-shaped rule owns this symptom
    }
    let symptom = zero_start_symptom(input.diagnostics) || input.diagnostics.contains("index 0");
    if !symptom {
        return None;
    }
    Some(StruggleCandidate::new(
        StruggleKind::ZeroBasedIndexing,
        "Sequences are indexed from 0; the first element is [0]",
    ))
}

fn off_by_one(input: &RuleInput) -> Option<StruggleCandidate> {
    if input.diagnostics.contains("off by one") {
        return Some(StruggleCandidate::new(
            StruggleKind::OffByOne,
            "Result is off by one from the expected value",
        ));
    }
    let caps = RE_EXPECTED_GOT.captures(input.diagnostics)?;
    let expected: i64 = caps[1].parse().ok()?;
    let got: i64 = caps[2].parse().ok()?;
    if (expected - got).abs() != 1 {
        return None;
    }
    Some(StruggleCandidate::new(
        StruggleKind::OffByOne,
        "Result is off by one from the expected value",
    ))
}

fn mutable_default_arg(input: &RuleInput) -> Option<StruggleCandidate> {
    let found = RE_MUTABLE_DEFAULT.find(input.code)?;
    Some(
        StruggleCandidate::new(
            StruggleKind::MutableDefaultArg,
            "Mutable default argument is shared between calls",
        )
        .with_code(snippet(found.as_str(), CODE_SNIPPET_CHARS)),
    )
}

fn shadowed_builtin(input: &RuleInput) -> Option<StruggleCandidate> {
    let caps = RE_SHADOWED_BUILTIN.captures(input.code)?;
    let name = caps[1].to_string();
    Some(StruggleCandidate::new(
        StruggleKind::ShadowedBuiltin,
        format!("Assignment to '{}' shadows the builtin", name),
    ))
}

fn floor_division(input: &RuleInput) -> Option<StruggleCandidate> {
    if !input.code.contains("//")
        || !input.diagnostics.contains("expected")
        || !RE_DECIMAL.is_match(input.diagnostics)
    {
        return None;
    }
    Some(StruggleCandidate::new(
        StruggleKind::FloorDivision,
        "// floors the result; use / to keep the fraction",
    ))
}

/// Indent-tracked scan for a `return` nested inside a `for`/`while` body.
/// Tolerates ragged input; anything unparseable reads as no-match.
fn return_inside_loop(code: &str) -> bool {
    let mut loop_depths: Vec<usize> = Vec::new();

    for raw in code.lines() {
        let stripped = raw.trim_start();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }
        let indent = raw.len() - stripped.len();

        while let Some(&depth) = loop_depths.last() {
            if indent <= depth {
                loop_depths.pop();
            } else {
                break;
            }
        }

        let is_return = stripped == "return"
            || stripped.starts_with("return ")
            || stripped.starts_with("return(");
        if is_return && !loop_depths.is_empty() {
            return true;
        }

        let is_loop_header = (stripped.starts_with("for ") || stripped.starts_with("while "))
            && stripped.trim_end().ends_with(':');
        if is_loop_header {
            loop_depths.push(indent);
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ObservationInput;

    fn failed(code: &str, error: Option<&str>, stdout: Option<&str>) -> Observation {
        ObservationInput {
            learner_id: "l".to_string(),
            challenge_id: "ch".to_string(),
            code: code.to_string(),
            success: false,
            error_output: error.map(str::to_string),
            stdout: stdout.map(str::to_string),
            tests_passed: 0,
            tests_total: 3,
            elapsed_seconds: 10.0,
            attempt_number: 2,
            concept_tags: vec![],
        }
        .into_observation()
    }

    fn kinds(observation: &Observation) -> Vec<StruggleKind> {
        StruggleClassifier::classify(observation)
            .into_iter()
            .map(|c| c.kind)
            .collect()
    }

    #[test]
    fn successful_observation_classifies_to_nothing() {
        let mut obs = failed("x = 1", Some("TypeError"), None);
        obs.success = true;
        assert!(StruggleClassifier::classify(&obs).is_empty());
    }

    #[test]
    fn diagnostic_group_stops_at_first_match() {
        let obs = failed(
            "if x\n    pass",
            Some("SyntaxError: expected ':' and also a TypeError mention"),
            None,
        );
        let found = kinds(&obs);
        assert_eq!(found, vec![StruggleKind::MissingColon]);
    }

    #[test]
    fn name_error_captures_the_name() {
        let obs = failed("print(total)", Some("NameError: name 'total' is not defined"), None);
        let findings = StruggleClassifier::classify(&obs);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, StruggleKind::NameUndefined);
        assert!(findings[0].description.contains("'total'"));
    }

    #[test]
    fn unbound_local_wins_over_name_undefined() {
        let obs = failed(
            "def f():\n    x += 1",
            Some("UnboundLocalError: local variable 'x' referenced before assignment"),
            None,
        );
        assert_eq!(kinds(&obs), vec![StruggleKind::UnboundLocal]);
    }

    #[test]
    fn nonetype_beats_generic_type_error() {
        let obs = failed(
            "x = f() + 1",
            Some("TypeError: unsupported operand type(s) for +: 'NoneType' and 'int'"),
            None,
        );
        let found = kinds(&obs);
        assert!(found.contains(&StruggleKind::NoneTypeOperation));
        assert!(!found.contains(&StruggleKind::TypeMismatch));
    }

    #[test]
    fn return_print_emits_print_vs_return() {
        let obs = failed(
            "def add(x):\n    return print(f\"Added {x}\")",
            Some("TypeError: unsupported operand type(s): 'NoneType'"),
            None,
        );
        let found = kinds(&obs);
        assert!(found.contains(&StruggleKind::PrintVsReturn));
    }

    #[test]
    fn operator_order_typo_on_reversed_compound_assignment() {
        let obs = failed(
            "health =- damage\nprint(health)",
            Some("AssertionError: expected 90, got -10"),
            None,
        );
        let found = kinds(&obs);
        assert!(found.contains(&StruggleKind::OperatorOrderTypo));
    }

    #[test]
    fn operator_order_typo_silent_when_compound_used_elsewhere() {
        let obs = failed(
            "health =- damage\nscore -= 1",
            Some("AssertionError: wrong value"),
            None,
        );
        let found = kinds(&obs);
        assert!(!found.contains(&StruggleKind::OperatorOrderTypo));
    }

    #[test]
    fn intended_negation_does_not_trip_operator_rule() {
        let obs = failed("x = -y\nz = x + 1", Some("AssertionError: boom"), None);
        let found = kinds(&obs);
        assert!(!found.contains(&StruggleKind::OperatorOrderTypo));
    }

    #[test]
    fn single_arg_range_with_zero_start_symptom() {
        let obs = failed(
            "for i in range(5):\n    print(i)",
            Some("Expected the list to start with 1 but output starts with 0"),
            Some("0\n1\n2\n3\n4"),
        );
        let found = kinds(&obs);
        assert!(found.contains(&StruggleKind::RangeStartZero));
        assert!(!found.contains(&StruggleKind::ZeroBasedIndexing));
    }

    #[test]
    fn generic_zero_start_without_range_shape() {
        let obs = failed(
            "first = items[1]",
            Some("Wrong element: indexing starts at 0"),
            None,
        );
        let found = kinds(&obs);
        assert!(found.contains(&StruggleKind::ZeroBasedIndexing));
        assert!(!found.contains(&StruggleKind::RangeStartZero));
    }

    #[test]
    fn string_vs_identifier_requires_matching_def() {
        let obs = failed(
            "def add(a, b):\n    return a + b\n\nif cmd == add:\n    print('hi')",
            Some("Expected output for 'add 1 2' but got nothing"),
            None,
        );
        let findings = StruggleClassifier::classify(&obs);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, StruggleKind::StringVsIdentifier);
        assert!(findings[0].description.contains("'add'"));
    }

    #[test]
    fn comparison_against_plain_variable_is_not_flagged() {
        let obs = failed(
            "if cmd == other:\n    pass",
            Some("AssertionError: nothing happened"),
            None,
        );
        let found = kinds(&obs);
        assert!(!found.contains(&StruggleKind::StringVsIdentifier));
    }

    #[test]
    fn early_return_inside_loop_with_truncated_output() {
        let obs = failed(
            "def total(items):\n    for item in items:\n        return item\n",
            Some("Expected all items but only the first was processed"),
            None,
        );
        let found = kinds(&obs);
        assert!(found.contains(&StruggleKind::EarlyReturnInLoop));
    }

    #[test]
    fn return_after_loop_is_fine() {
        let obs = failed(
            "def total(items):\n    for item in items:\n        s = item\n    return s\n",
            Some("AssertionError: nameerror-free failure message"),
            None,
        );
        assert!(!return_inside_loop(&obs.code));
    }

    #[test]
    fn off_by_one_from_expected_got_delta() {
        let obs = failed("n = len(items)", Some("AssertionError: expected 10, got 9"), None);
        let found = kinds(&obs);
        assert!(found.contains(&StruggleKind::OffByOne));
    }

    #[test]
    fn mutable_default_and_shadowed_builtin_fire_structurally() {
        let obs = failed(
            "list = [1, 2]\ndef push(item, acc=[]):\n    acc.append(item)\n",
            Some("AssertionError: accumulated values leak between calls"),
            None,
        );
        let found = kinds(&obs);
        assert!(found.contains(&StruggleKind::MutableDefaultArg));
        assert!(found.contains(&StruggleKind::ShadowedBuiltin));
    }

    #[test]
    fn accidental_none_in_stdout() {
        let obs = failed(
            "print(do_work())",
            None,
            Some("step 1\nNone\nstep 2"),
        );
        let found = kinds(&obs);
        assert!(found.contains(&StruggleKind::AccidentalNoneOutput));
    }

    #[test]
    fn partial_passes_with_no_match_fall_back_to_logic_error() {
        let mut obs = failed("x = compute()", Some("values differ"), None);
        obs.tests_passed = 2;
        let findings = StruggleClassifier::classify(&obs);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, StruggleKind::LogicError);
    }

    #[test]
    fn total_miss_with_zero_passes_stays_silent() {
        let obs = failed("x = compute()", Some("values differ"), None);
        assert!(StruggleClassifier::classify(&obs).is_empty());
    }

    #[test]
    fn malformed_text_never_panics() {
        let obs = failed("((((", Some("\u{0000}\u{FFFD} expected got"), Some("€€€"));
        let _ = StruggleClassifier::classify(&obs);
    }
}
