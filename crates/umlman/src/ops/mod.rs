//! Lifecycle protocols over an [`UmlEnv`](crate::env::UmlEnv).
//!
//! These functions hold no locks; [`DiagramService`](crate::service::DiagramService)
//! serializes them.

pub mod create;
pub mod delete;
pub mod list;
pub mod promote;
pub mod read;
pub mod references;
pub mod update;
pub mod validate;

pub use create::{CreateDiagramOptions, create_diagram};
pub use delete::delete_diagram;
pub use list::list_diagrams;
pub use promote::promote_diagram;
pub use read::read_diagram;
pub use references::resolve_references;
pub use update::update_in_progress;
pub use validate::{validate_content, validate_diagram};

use crate::error::{UmlError, codes};
use crate::model::DiagramId;

pub(crate) const COMPONENT: &str = "lifecycle";

pub(crate) fn require_content(content: &str) -> Result<(), UmlError> {
    if content.is_empty() {
        return Err(UmlError::validation(
            codes::EMPTY_CONTENT,
            "content must not be empty",
        ));
    }
    Ok(())
}

pub(crate) fn identify(err: UmlError, operation: &str, id: &DiagramId) -> UmlError {
    err.tagged(operation, COMPONENT)
        .with_context("name", &id.name)
        .with_context("version", &id.version)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::config::UmlConfig;
    use crate::env::UmlEnv;
    use crate::model::{DiagramId, DiagramType};

    pub const VALID: &str = "@startuml\n[*] --> Idle\nIdle --> Running : start\nRunning --> [*]\n@enduml\n";

    pub fn env() -> (TempDir, UmlEnv) {
        let temp = TempDir::new().unwrap();
        let env = UmlEnv::from_path(temp.path()).unwrap();
        (temp, env)
    }

    pub fn env_with(
        repository: Arc<dyn crate::storage::DiagramRepository>,
        root: &std::path::Path,
    ) -> UmlEnv {
        UmlEnv::new(
            UmlConfig::with_root(root),
            repository,
            Arc::new(crate::validation::PlantUmlValidator::new()),
        )
        .unwrap()
    }

    pub fn id(name: &str, version: &str) -> DiagramId {
        DiagramId::parse(DiagramType::Puml, name, version).unwrap()
    }
}
