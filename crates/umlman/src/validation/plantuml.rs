use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::{Diagram, Reference};
use crate::validation::references::{check_references, parse_product_references};
use crate::validation::{Diagnostic, DiagramValidator, Strictness, VerificationResult};

pub const EMPTY_CONTENT: &str = "EMPTY_CONTENT";
pub const MISSING_START: &str = "MISSING_START";
pub const MISSING_END: &str = "MISSING_END";
pub const NO_STATES: &str = "NO_STATES";
pub const CONTENT_BEFORE_START: &str = "CONTENT_BEFORE_START";
pub const CONTENT_AFTER_END: &str = "CONTENT_AFTER_END";
pub const UNBALANCED_BRACES: &str = "UNBALANCED_BRACES";
pub const INVALID_TRANSITION: &str = "INVALID_TRANSITION";
pub const MISSING_INITIAL_STATE: &str = "MISSING_INITIAL_STATE";
pub const DUPLICATE_STATE: &str = "DUPLICATE_STATE";

/// Structural codes that stay errors even under lenient (products) validation.
/// Extending this set can invalidate already-released diagrams.
pub const CRITICAL_CODES: [&str; 4] = [EMPTY_CONTENT, MISSING_START, MISSING_END, NO_STATES];

const INITIAL_PSEUDO_STATE: &str = "[*]";

fn transition_regex() -> &'static Regex {
    static TRANSITION_REGEX: OnceLock<Regex> = OnceLock::new();
    TRANSITION_REGEX.get_or_init(|| {
        Regex::new(
            r"^(\[\*\]|[A-Za-z_][\w.]*)\s*-[^\s>]*>\s*(\[\*\]|[A-Za-z_][\w.]*)\s*(?::.*)?$",
        )
        .expect("valid transition regex")
    })
}

fn arrow_regex() -> &'static Regex {
    static ARROW_REGEX: OnceLock<Regex> = OnceLock::new();
    ARROW_REGEX.get_or_init(|| Regex::new(r"-[^\s>]*>").expect("valid arrow regex"))
}

fn state_regex() -> &'static Regex {
    static STATE_REGEX: OnceLock<Regex> = OnceLock::new();
    STATE_REGEX.get_or_init(|| {
        Regex::new(r#"^state\s+(?:"[^"]*"\s+as\s+)?([A-Za-z_][\w.]*)[^{]*(\{)?\s*$"#)
            .expect("valid state regex")
    })
}

fn description_regex() -> &'static Regex {
    static DESCRIPTION_REGEX: OnceLock<Regex> = OnceLock::new();
    DESCRIPTION_REGEX
        .get_or_init(|| Regex::new(r"^[A-Za-z_][\w.]*\s*:").expect("valid description regex"))
}

/// Line-based checker for PlantUML state diagrams.
#[derive(Clone, Debug, Default)]
pub struct PlantUmlValidator;

impl PlantUmlValidator {
    pub fn new() -> Self {
        Self
    }

    /// Findings before strictness is applied.
    pub fn check(&self, content: &str) -> VerificationResult {
        let mut result = VerificationResult::new();

        if content.trim().is_empty() {
            result.push_error(Diagnostic::new(EMPTY_CONTENT, "diagram content is empty"));
            return result;
        }

        let lines = meaningful_lines(content);

        let start = lines.iter().position(|l| l.text.starts_with("@startuml"));
        let Some(start) = start else {
            result.push_error(Diagnostic::new(
                MISSING_START,
                "diagram does not contain @startuml",
            ));
            return result;
        };

        if let Some(first) = lines[..start].first() {
            result.push_error(
                Diagnostic::new(CONTENT_BEFORE_START, "content found before @startuml")
                    .at(first.number, first.column)
                    .with_context(first.text),
            );
        }

        let end = lines[start + 1..]
            .iter()
            .position(|l| l.text.starts_with("@enduml"))
            .map(|offset| start + 1 + offset);

        let body = match end {
            Some(end) => {
                if let Some(trailing) = lines.get(end + 1) {
                    result.push_error(
                        Diagnostic::new(CONTENT_AFTER_END, "content found after @enduml")
                            .at(trailing.number, trailing.column)
                            .with_context(trailing.text),
                    );
                }
                &lines[start + 1..end]
            }
            None => {
                result.push_error(Diagnostic::new(
                    MISSING_END,
                    "diagram does not contain @enduml",
                ));
                &lines[start + 1..]
            }
        };

        check_body(body, &mut result);
        result
    }

    /// Applies location strictness to raw findings.
    pub fn apply_strictness(
        mut result: VerificationResult,
        strictness: Strictness,
    ) -> VerificationResult {
        if strictness == Strictness::Strict {
            return result;
        }

        let (critical, downgraded): (Vec<_>, Vec<_>) = result
            .errors
            .drain(..)
            .partition(|d| CRITICAL_CODES.contains(&d.code.as_str()));
        result.errors = critical;
        result.warnings.extend(downgraded);
        result.is_valid = result.errors.is_empty();
        result
    }
}

impl DiagramValidator for PlantUmlValidator {
    fn validate_content(&self, content: &str, strictness: Strictness) -> VerificationResult {
        Self::apply_strictness(self.check(content), strictness)
    }

    fn validate_references(&self, diagram: &Diagram) -> VerificationResult {
        check_references(diagram)
    }

    fn parse_references(&self, diagram: &Diagram) -> Vec<Reference> {
        parse_product_references(&diagram.content)
    }
}

struct Line<'a> {
    number: usize,
    column: usize,
    text: &'a str,
}

/// Non-blank lines outside comments, trimmed, with 1-based positions.
fn meaningful_lines(content: &str) -> Vec<Line<'_>> {
    let mut in_block_comment = false;
    let mut lines = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let text = raw.trim();
        if in_block_comment {
            if text.ends_with("'/") {
                in_block_comment = false;
            }
            continue;
        }
        if text.starts_with("/'") {
            in_block_comment = !text[2..].ends_with("'/");
            continue;
        }
        if text.is_empty() || text.starts_with('\'') {
            continue;
        }
        lines.push(Line {
            number: idx + 1,
            column: raw.len() - raw.trim_start().len() + 1,
            text,
        });
    }

    lines
}

fn check_body(body: &[Line<'_>], result: &mut VerificationResult) {
    let mut open_composites: Vec<&Line<'_>> = Vec::new();
    let mut declared = HashSet::new();
    let mut has_states = false;
    let mut has_initial = false;
    let mut in_note = false;

    for line in body {
        let text = line.text;

        if in_note {
            if text == "end note" || text == "endnote" {
                in_note = false;
            }
            continue;
        }

        if text.starts_with("note ") && !text.contains(':') && !text.contains('"') {
            in_note = true;
            continue;
        }

        // Preprocessor directives (including `!include`) carry no states.
        if text.starts_with('!')
            || text.starts_with("skinparam")
            || text.starts_with("hide ")
            || text.starts_with("title ")
            || text.starts_with("note ")
            || text == "--"
            || text == "||"
        {
            continue;
        }

        if text == "}" {
            if open_composites.pop().is_none() {
                result.push_error(
                    Diagnostic::new(UNBALANCED_BRACES, "closing brace without open composite state")
                        .at(line.number, line.column),
                );
            }
            continue;
        }

        if let Some(caps) = state_regex().captures(text) {
            has_states = true;
            let name = caps[1].to_string();
            if !declared.insert(name.clone()) {
                result.push_warning(
                    Diagnostic::new(DUPLICATE_STATE, format!("state `{name}` declared more than once"))
                        .at(line.number, line.column)
                        .with_context(text),
                );
            }
            if caps.get(2).is_some() {
                open_composites.push(line);
            }
            continue;
        }

        if let Some(caps) = transition_regex().captures(text) {
            has_states = true;
            if &caps[1] == INITIAL_PSEUDO_STATE {
                has_initial = true;
            }
            continue;
        }

        if description_regex().is_match(text) {
            has_states = true;
            continue;
        }

        if arrow_regex().is_match(text) {
            result.push_error(
                Diagnostic::new(INVALID_TRANSITION, "transition is missing a source or target state")
                    .at(line.number, line.column)
                    .with_context(text),
            );
        }
    }

    for unclosed in open_composites {
        result.push_error(
            Diagnostic::new(UNBALANCED_BRACES, "composite state is never closed")
                .at(unclosed.number, unclosed.column)
                .with_context(unclosed.text),
        );
    }

    if !has_states {
        result.push_error(Diagnostic::new(NO_STATES, "diagram declares no states or transitions"));
    } else if !has_initial {
        result.push_warning(Diagnostic::new(
            MISSING_INITIAL_STATE,
            "no transition from the initial pseudo-state [*]",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiagramId, DiagramType, Location};

    const VALID: &str = "@startuml\n[*] --> Idle\nIdle --> [*]\n@enduml";

    fn check(content: &str) -> VerificationResult {
        PlantUmlValidator::new().check(content)
    }

    #[test]
    fn minimal_state_machine_is_clean() {
        let result = check(VALID);
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn missing_enduml_is_reported() {
        let result = check("@startuml\n' missing enduml");
        assert!(!result.is_valid);
        assert!(result.error_codes().contains(&MISSING_END));
    }

    #[test]
    fn missing_startuml_and_empty_content() {
        assert_eq!(check("[*] --> A\n@enduml").error_codes(), vec![MISSING_START]);
        assert_eq!(check("  \n\n").error_codes(), vec![EMPTY_CONTENT]);
    }

    #[test]
    fn no_states_is_critical_error() {
        let result = check("@startuml\ntitle Empty\n@enduml");
        assert_eq!(result.error_codes(), vec![NO_STATES]);
    }

    #[test]
    fn stray_content_around_markers() {
        let result = check("junk\n@startuml\n[*] --> A\n@enduml\nmore");
        assert_eq!(
            result.error_codes(),
            vec![CONTENT_BEFORE_START, CONTENT_AFTER_END]
        );
        assert_eq!(result.errors[0].line, 1);
        assert_eq!(result.errors[1].line, 5);
    }

    #[test]
    fn composite_states_must_balance() {
        let open = check("@startuml\n[*] --> Active\nstate Active {\n  [*] --> Sub\n@enduml");
        assert_eq!(open.error_codes(), vec![UNBALANCED_BRACES]);
        assert_eq!(open.errors[0].line, 3);

        let stray = check("@startuml\n[*] --> A\n}\n@enduml");
        assert_eq!(stray.error_codes(), vec![UNBALANCED_BRACES]);

        let balanced = check(
            "@startuml\n[*] --> Active\nstate \"Active state\" as Active {\n  [*] --> Sub\n  Sub --> [*]\n}\n@enduml",
        );
        assert!(balanced.is_valid, "{:?}", balanced.errors);
    }

    #[test]
    fn dangling_arrow_is_invalid_transition() {
        let result = check("@startuml\n[*] --> A\n  A -->\n@enduml");
        assert_eq!(result.error_codes(), vec![INVALID_TRANSITION]);
        assert_eq!((result.errors[0].line, result.errors[0].column), (3, 3));
    }

    #[test]
    fn styled_arrows_and_labels_are_transitions() {
        let result = check(
            "@startuml\n[*] -> A\nA -left-> B : go\nB -[#red,dashed]-> [*]\nA : waiting\n@enduml",
        );
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn warnings_for_missing_initial_and_duplicates() {
        let result = check("@startuml\nstate A\nstate A\nA --> [*]\n@enduml");
        assert!(result.is_valid);
        assert_eq!(
            result.warning_codes(),
            vec![DUPLICATE_STATE, MISSING_INITIAL_STATE]
        );
    }

    #[test]
    fn comments_and_notes_are_ignored() {
        let result = check(
            "@startuml\n/' block\n A --> \n'/\n' A -->\nnote left of Idle\n  Idle -->\nend note\n[*] --> Idle\n@enduml",
        );
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn lenient_strictness_downgrades_only_non_critical_errors() {
        let raw = check("@startuml\n[*] --> A\nA -->\n}\n");
        assert_eq!(
            raw.error_codes(),
            vec![MISSING_END, INVALID_TRANSITION, UNBALANCED_BRACES]
        );

        let lenient = PlantUmlValidator::apply_strictness(raw.clone(), Strictness::Lenient);
        assert_eq!(lenient.error_codes(), vec![MISSING_END]);
        assert_eq!(
            lenient.warning_codes(),
            vec![INVALID_TRANSITION, UNBALANCED_BRACES]
        );

        let strict = PlantUmlValidator::apply_strictness(raw.clone(), Strictness::Strict);
        assert_eq!(strict, raw);
    }

    #[test]
    fn lenient_result_becomes_valid_when_only_non_critical_errors() {
        let d = Diagram::new(
            DiagramId::parse(DiagramType::Puml, "legacy", "1.0.0").unwrap(),
            "@startuml\n[*] --> A\nA -->\n@enduml",
            Location::Products,
        );
        let validator = PlantUmlValidator::new();
        assert!(!validator.validate(&d, Strictness::Strict).is_valid);
        let lenient = validator.validate(&d, Strictness::Lenient);
        assert!(lenient.is_valid);
        assert_eq!(lenient.warning_codes(), vec![INVALID_TRANSITION]);
    }
}
