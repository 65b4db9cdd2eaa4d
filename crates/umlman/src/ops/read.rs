use tracing::debug;

use crate::env::UmlEnv;
use crate::error::UmlError;
use crate::model::{Diagram, DiagramId, Location};
use crate::ops::identify;

const OPERATION: &str = "read";

/// Stored diagram at `location`. A missing file is `ErrorKind::FileNotFound`.
pub fn read_diagram(env: &UmlEnv, id: &DiagramId, location: Location) -> Result<Diagram, UmlError> {
    debug!(diagram = %id, %location, "reading diagram");
    env.paths
        .file_path(id.diagram_type, &id.name, &id.version, location)
        .and_then(|_| env.repository.read(id, location))
        .map_err(|err| identify(err, OPERATION, id).with_context("location", location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ops::create::{CreateDiagramOptions, create_diagram};
    use crate::ops::testing::{VALID, env, id};

    #[test]
    fn read_returns_stored_content_without_references() {
        let (_temp, env) = env();
        create_diagram(&env, CreateDiagramOptions::new("auth", "1.0.0", VALID)).unwrap();

        let diagram = read_diagram(&env, &id("auth", "1.0.0"), Location::InProgress).unwrap();
        assert_eq!(diagram.content, VALID);
        assert_eq!(diagram.location, Location::InProgress);
        assert!(diagram.references.is_empty());
    }

    #[test]
    fn missing_diagram_is_file_not_found() {
        let (_temp, env) = env();
        let err = read_diagram(&env, &id("auth", "1.0.0"), Location::Products)
            .expect_err("nothing stored");
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert_eq!(err.context_value("location"), Some("products"));
        assert_eq!(err.context_value("version"), Some("1.0.0"));
    }
}
