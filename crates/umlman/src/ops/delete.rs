use tracing::info;

use crate::env::UmlEnv;
use crate::error::{ErrorKind, UmlError};
use crate::model::{DiagramId, Location};
use crate::ops::identify;

const OPERATION: &str = "delete";

pub fn delete_diagram(env: &UmlEnv, id: &DiagramId, location: Location) -> Result<(), UmlError> {
    delete_checked(env, id, location)
        .map_err(|err| identify(err, OPERATION, id).with_context("location", location))
}

fn delete_checked(env: &UmlEnv, id: &DiagramId, location: Location) -> Result<(), UmlError> {
    env.paths
        .file_path(id.diagram_type, &id.name, &id.version, location)?;
    if !env.repository.exists(id, location)? {
        return Err(UmlError::new(
            ErrorKind::FileNotFound,
            format!("diagram {id} not found in {location}"),
        ));
    }
    env.repository.delete(id, location)?;
    info!(diagram = %id, %location, "deleted diagram");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::create::{CreateDiagramOptions, create_diagram};
    use crate::ops::testing::{VALID, env, id};

    #[test]
    fn delete_removes_the_file() {
        let (temp, env) = env();
        create_diagram(&env, CreateDiagramOptions::new("auth", "1.0.0", VALID)).unwrap();

        delete_diagram(&env, &id("auth", "1.0.0"), Location::InProgress).unwrap();
        assert!(!temp.path().join("in-progress/puml/auth-1.0.0.puml").exists());
    }

    #[test]
    fn delete_of_missing_diagram_is_file_not_found() {
        let (_temp, env) = env();
        create_diagram(&env, CreateDiagramOptions::new("auth", "1.0.0", VALID)).unwrap();

        let err = delete_diagram(&env, &id("auth", "1.0.0"), Location::Products)
            .expect_err("only the draft exists");
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert_eq!(err.context_value("location"), Some("products"));
        assert!(
            env.repository
                .exists(&id("auth", "1.0.0"), Location::InProgress)
                .unwrap()
        );
    }
}
