use tracing::debug;

use crate::env::UmlEnv;
use crate::error::{ErrorKind, UmlError};
use crate::model::{Diagram, DiagramId, Location, ReferenceType};
use crate::ops::identify;

const OPERATION: &str = "resolve_references";

/// Parses the product references in `diagram` and points each one at its
/// released file. Every target must already exist in products.
pub fn resolve_references(env: &UmlEnv, diagram: &Diagram) -> Result<Diagram, UmlError> {
    let id = diagram.id();
    resolve_checked(env, diagram).map_err(|err| identify(err, OPERATION, &id))
}

fn resolve_checked(env: &UmlEnv, diagram: &Diagram) -> Result<Diagram, UmlError> {
    let checked = env.validator.validate_references(diagram);
    if checked.has_errors() {
        return Err(UmlError::new(
            ErrorKind::ReferenceParsing,
            format!(
                "diagram {} contains {} malformed reference(s)",
                diagram.id(),
                checked.errors.len()
            ),
        )
        .with_context("errors", checked.error_codes().join(",")));
    }

    let mut resolved = diagram.clone();
    resolved.references = env.validator.parse_references(diagram);

    for reference in &mut resolved.references {
        match reference.reference_type {
            ReferenceType::Product => {
                let target = DiagramId::new(
                    diagram.diagram_type,
                    reference.name.clone(),
                    reference.version.clone(),
                );
                let path = env.paths.file_path(
                    target.diagram_type,
                    &target.name,
                    &target.version,
                    Location::Products,
                )?;
                if !env.repository.exists(&target, Location::Products)? {
                    return Err(UmlError::new(
                        ErrorKind::ReferenceResolution,
                        format!("referenced diagram {target} is not released"),
                    )
                    .with_context("referenceName", &reference.name)
                    .with_context("referenceVersion", &reference.version));
                }
                reference.path = Some(path);
            }
        }
    }

    debug!(
        diagram = %diagram.id(),
        count = resolved.references.len(),
        "resolved product references"
    );
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::{VALID, env, id};

    fn including(targets: &[&str]) -> String {
        let includes: String = targets
            .iter()
            .map(|t| format!("!include {t}\n"))
            .collect();
        format!("@startuml\n{includes}[*] --> A\n@enduml\n")
    }

    #[test]
    fn released_targets_resolve_to_product_paths() {
        let (temp, env) = env();
        env.repository
            .write(&Diagram::new(id("common", "1.2.0"), VALID, Location::Products))
            .unwrap();
        let draft = Diagram::new(
            id("main", "1.0.0"),
            including(&["../products/puml/common-1.2.0.puml", "shared/style.iuml"]),
            Location::InProgress,
        );

        let resolved = resolve_references(&env, &draft).unwrap();
        assert_eq!(resolved.references.len(), 1);
        let reference = &resolved.references[0];
        assert_eq!(reference.name, "common");
        assert!(reference.is_resolved());
        assert!(
            reference
                .path
                .as_ref()
                .unwrap()
                .ends_with("products/puml/common-1.2.0.puml")
        );
        assert!(reference.path.as_ref().unwrap().starts_with(temp.path()));
        assert!(draft.references.is_empty());
    }

    #[test]
    fn unreleased_target_fails_with_its_identity() {
        let (_temp, env) = env();
        // Drafts do not satisfy product references.
        env.repository
            .write(&Diagram::new(id("common", "1.2.0"), VALID, Location::InProgress))
            .unwrap();
        let draft = Diagram::new(
            id("main", "1.0.0"),
            including(&["products/puml/common-1.2.0.puml"]),
            Location::InProgress,
        );

        let err = resolve_references(&env, &draft).expect_err("target is a draft");
        assert_eq!(err.kind(), ErrorKind::ReferenceResolution);
        assert_eq!(err.context_value("referenceName"), Some("common"));
        assert_eq!(err.context_value("referenceVersion"), Some("1.2.0"));
        assert_eq!(err.context_value("name"), Some("main"));
    }

    #[test]
    fn malformed_reference_is_parsing_error() {
        let (_temp, env) = env();
        let draft = Diagram::new(
            id("main", "1.0.0"),
            including(&["products/puml/no-version.puml"]),
            Location::InProgress,
        );
        let err = resolve_references(&env, &draft).expect_err("unparseable target");
        assert_eq!(err.kind(), ErrorKind::ReferenceParsing);
        assert_eq!(err.context_value("errors"), Some("INVALID_REFERENCE"));
    }

    #[test]
    fn diagram_without_includes_resolves_to_nothing() {
        let (_temp, env) = env();
        let draft = Diagram::new(id("main", "1.0.0"), VALID, Location::InProgress);
        let resolved = resolve_references(&env, &draft).unwrap();
        assert!(resolved.references.is_empty());
    }
}
