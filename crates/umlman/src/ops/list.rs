use tracing::debug;

use crate::env::UmlEnv;
use crate::error::UmlError;
use crate::model::{Diagram, DiagramType, Location};
use crate::ops::COMPONENT;

/// Diagrams stored under `location`, ordered by name then version.
pub fn list_diagrams(
    env: &UmlEnv,
    diagram_type: DiagramType,
    location: Location,
) -> Result<Vec<Diagram>, UmlError> {
    let diagrams = env
        .repository
        .list(diagram_type, location)
        .map_err(|err| {
            err.tagged("list", COMPONENT)
                .with_context("location", location)
        })?;
    debug!(%location, count = diagrams.len(), "listed diagrams");
    Ok(diagrams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::create::{CreateDiagramOptions, create_diagram};
    use crate::ops::testing::{VALID, env};

    #[test]
    fn lists_only_the_requested_location() {
        let (temp, env) = env();
        for (name, version) in [("beta", "1.0.0"), ("alpha", "2.0.0"), ("alpha", "1.0.0-rc.1")] {
            create_diagram(&env, CreateDiagramOptions::new(name, version, VALID)).unwrap();
        }
        std::fs::write(temp.path().join("in-progress/puml/README.md"), "notes").unwrap();

        let listed = list_diagrams(&env, DiagramType::Puml, Location::InProgress).unwrap();
        let ids: Vec<String> = listed.iter().map(|d| format!("{}-{}", d.name, d.version)).collect();
        assert_eq!(ids, vec!["alpha-1.0.0-rc.1", "alpha-2.0.0", "beta-1.0.0"]);

        let released = list_diagrams(&env, DiagramType::Puml, Location::Products).unwrap();
        assert!(released.is_empty());
    }
}
