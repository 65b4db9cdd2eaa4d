use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::model::{Diagram, DiagramType, Location, Reference};
use crate::paths::PathManager;
use crate::validation::{Diagnostic, VerificationResult};

pub const INVALID_REFERENCE: &str = "INVALID_REFERENCE";
pub const SELF_REFERENCE: &str = "SELF_REFERENCE";
pub const DUPLICATE_REFERENCE: &str = "DUPLICATE_REFERENCE";
pub const UNSUPPORTED_REFERENCE: &str = "UNSUPPORTED_REFERENCE";

const NESTED_SEGMENT: &str = "nested";

/// An `!include` line found in diagram content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct IncludeDirective {
    pub line: usize,
    pub column: usize,
    pub target: String,
}

enum IncludeTarget {
    Product(Result<Reference, String>),
    Nested,
    External,
}

fn include_regex() -> &'static Regex {
    static INCLUDE_REGEX: OnceLock<Regex> = OnceLock::new();
    INCLUDE_REGEX.get_or_init(|| {
        Regex::new(r"^(\s*)!include(?:_once|_many)?\s+(.+?)\s*$").expect("valid include regex")
    })
}

pub(crate) fn include_directives(content: &str) -> Vec<IncludeDirective> {
    content
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let caps = include_regex().captures(line)?;
            let target = caps[2]
                .trim_matches(|c| matches!(c, '"' | '\'' | '<' | '>'))
                .to_string();
            Some(IncludeDirective {
                line: idx + 1,
                column: caps[1].len() + 1,
                target,
            })
        })
        .collect()
}

fn classify(target: &str) -> IncludeTarget {
    let segments: Vec<&str> = target
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .collect();
    let Some((file_name, dirs)) = segments.split_last() else {
        return IncludeTarget::External;
    };

    if dirs.contains(&Location::Products.dir_name()) {
        let parsed = PathManager::parse_file_name(DiagramType::Puml, file_name)
            .map(|(name, version)| Reference::product(name, version))
            .map_err(|err| err.message().to_string());
        return IncludeTarget::Product(parsed);
    }

    if dirs.contains(&NESTED_SEGMENT) {
        return IncludeTarget::Nested;
    }

    IncludeTarget::External
}

/// Product references in `content`, de-duplicated, in order of first appearance.
pub fn parse_product_references(content: &str) -> Vec<Reference> {
    let mut seen = HashSet::new();
    include_directives(content)
        .into_iter()
        .filter_map(|directive| match classify(&directive.target) {
            IncludeTarget::Product(Ok(reference)) => Some(reference),
            _ => None,
        })
        .filter(|reference| seen.insert((reference.name.clone(), reference.version.clone())))
        .collect()
}

pub(crate) fn check_references(diagram: &Diagram) -> VerificationResult {
    let mut result = VerificationResult::new();
    let mut seen = HashSet::new();

    for directive in include_directives(&diagram.content) {
        let at = |d: Diagnostic| {
            d.at(directive.line, directive.column)
                .with_context(directive.target.clone())
        };

        match classify(&directive.target) {
            IncludeTarget::Product(Ok(reference)) => {
                if reference.name == diagram.name && reference.version == diagram.version {
                    result.push_error(at(Diagnostic::new(
                        SELF_REFERENCE,
                        format!(
                            "diagram {}-{} includes itself",
                            diagram.name, diagram.version
                        ),
                    )));
                } else if !seen.insert((reference.name.clone(), reference.version.clone())) {
                    result.push_warning(at(Diagnostic::new(
                        DUPLICATE_REFERENCE,
                        format!(
                            "reference to {}-{} appears more than once",
                            reference.name, reference.version
                        ),
                    )));
                }
            }
            IncludeTarget::Product(Err(reason)) => {
                result.push_error(at(Diagnostic::new(
                    INVALID_REFERENCE,
                    format!("malformed product reference: {reason}"),
                )));
            }
            IncludeTarget::Nested => {
                result.push_warning(at(Diagnostic::new(
                    UNSUPPORTED_REFERENCE,
                    "nested references are not supported",
                )));
            }
            IncludeTarget::External => {}
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DiagramId;
    use crate::version::Version;

    fn diagram(name: &str, version: &str, content: &str) -> Diagram {
        Diagram::new(
            DiagramId::parse(DiagramType::Puml, name, version).unwrap(),
            content,
            Location::InProgress,
        )
    }

    #[test]
    fn extracts_product_includes_in_order_without_duplicates() {
        let content = "@startuml\n\
            !include products/puml/auth-1.0.0.puml\n\
            !include ../products/puml/billing-flow-2.0.0-rc.1.puml\n\
            !include products/puml/auth-1.0.0.puml\n\
            !include common/style.iuml\n\
            [*] --> A\n\
            @enduml";
        let refs = parse_product_references(content);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].name, "auth");
        assert_eq!(refs[0].version, Version::parse("1.0.0").unwrap());
        assert_eq!(refs[1].name, "billing-flow");
        assert_eq!(refs[1].version, Version::parse("2.0.0-rc.1").unwrap());
        assert!(refs.iter().all(|r| r.path.is_none()));
    }

    #[test]
    fn include_targets_may_be_quoted_or_bracketed() {
        let directives = include_directives("  !include \"products/puml/a-1.0.0.puml\"\n!include_once <x>");
        assert_eq!(directives[0].target, "products/puml/a-1.0.0.puml");
        assert_eq!((directives[0].line, directives[0].column), (1, 3));
        assert_eq!(directives[1].target, "x");
    }

    #[test]
    fn check_reports_malformed_self_and_nested_references() {
        let d = diagram(
            "main",
            "1.0.0",
            "@startuml\n\
             !include products/puml/broken.puml\n\
             !include products/puml/main-1.0.0.puml\n\
             !include nested/puml/child-1.0.0.puml\n\
             !include products/puml/dep-1.0.0.puml\n\
             !include products/puml/dep-1.0.0.puml\n\
             @enduml",
        );
        let result = check_references(&d);
        assert_eq!(result.error_codes(), vec![INVALID_REFERENCE, SELF_REFERENCE]);
        assert_eq!(
            result.warning_codes(),
            vec![UNSUPPORTED_REFERENCE, DUPLICATE_REFERENCE]
        );
        assert_eq!(result.errors[0].line, 2);
        assert!(!result.is_valid);
    }

    #[test]
    fn content_without_includes_is_valid() {
        let d = diagram("plain", "1.0.0", "@startuml\n[*] --> A\n@enduml");
        let result = check_references(&d);
        assert!(result.is_valid);
        assert!(result.warnings.is_empty());
    }
}
