use tracing::debug;

use crate::env::UmlEnv;
use crate::error::UmlError;
use crate::model::{DiagramId, Location};
use crate::ops::identify;
use crate::validation::{Strictness, VerificationResult};

/// Validates a stored diagram with the strictness of the location it lives in.
pub fn validate_diagram(
    env: &UmlEnv,
    id: &DiagramId,
    location: Location,
) -> Result<VerificationResult, UmlError> {
    let diagram = env
        .repository
        .read(id, location)
        .map_err(|err| identify(err, "validate", id).with_context("location", location))?;
    let result = env
        .validator
        .validate(&diagram, Strictness::for_location(location));
    debug!(
        diagram = %id,
        %location,
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "validated diagram"
    );
    Ok(result)
}

/// Validates unsaved text using the configured default level.
pub fn validate_content(env: &UmlEnv, content: &str) -> VerificationResult {
    let strictness = Strictness::for_location(env.config.validation_level);
    env.validator.validate_content(content, strictness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::Diagram;
    use crate::ops::testing::{VALID, env, id};
    use crate::validation::plantuml::{CONTENT_AFTER_END, MISSING_END};

    const TRAILING: &str = "@startuml\n[*] --> A\n@enduml\nstray\n";

    #[test]
    fn strictness_follows_location() {
        let (_temp, env) = env();
        env.repository
            .write(&Diagram::new(id("draft", "1.0.0"), TRAILING, Location::InProgress))
            .unwrap();
        env.repository
            .write(&Diagram::new(id("release", "1.0.0"), TRAILING, Location::Products))
            .unwrap();

        let strict = validate_diagram(&env, &id("draft", "1.0.0"), Location::InProgress).unwrap();
        assert_eq!(strict.error_codes(), vec![CONTENT_AFTER_END]);
        assert!(!strict.is_valid);

        let lenient = validate_diagram(&env, &id("release", "1.0.0"), Location::Products).unwrap();
        assert!(lenient.is_valid);
        assert_eq!(lenient.warning_codes(), vec![CONTENT_AFTER_END]);
    }

    #[test]
    fn validating_missing_diagram_fails() {
        let (_temp, env) = env();
        let err = validate_diagram(&env, &id("ghost", "1.0.0"), Location::InProgress)
            .expect_err("nothing stored");
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn raw_content_uses_configured_level() {
        let (_temp, env) = env();
        assert!(validate_content(&env, VALID).is_valid);
        let result = validate_content(&env, "@startuml\n[*] --> A\n");
        assert_eq!(result.error_codes(), vec![MISSING_END]);
    }
}
