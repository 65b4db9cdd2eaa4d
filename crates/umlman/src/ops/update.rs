use chrono::Utc;
use tracing::info;

use crate::env::UmlEnv;
use crate::error::{ErrorKind, UmlError, codes};
use crate::model::{Diagram, Location};
use crate::ops::{identify, require_content};
use crate::paths::PathManager;

const OPERATION: &str = "update";

/// Rewrites the content of an existing draft.
///
/// `created_at` is carried over from `diagram`; `modified_at` is refreshed.
/// Released diagrams are immutable and fail with `ErrorKind::Validation`.
pub fn update_in_progress(env: &UmlEnv, diagram: &Diagram) -> Result<Diagram, UmlError> {
    let id = diagram.id();
    update_checked(env, diagram).map_err(|err| identify(err, OPERATION, &id))
}

fn update_checked(env: &UmlEnv, diagram: &Diagram) -> Result<Diagram, UmlError> {
    if diagram.location != Location::InProgress {
        return Err(UmlError::validation(
            codes::INVALID_LOCATION,
            format!("diagrams in {} cannot be updated", diagram.location),
        )
        .with_context("location", diagram.location));
    }
    PathManager::validate_name(&diagram.name)?;
    require_content(&diagram.content)?;

    let id = diagram.id();
    env.paths
        .file_path(id.diagram_type, &id.name, &id.version, Location::InProgress)?;
    if !env.repository.exists(&id, Location::InProgress)? {
        return Err(UmlError::new(
            ErrorKind::FileNotFound,
            format!("diagram {id} not found in {}", Location::InProgress),
        )
        .with_context("location", Location::InProgress));
    }

    let mut updated = diagram.clone();
    updated.metadata.modified_at = Utc::now();
    env.repository.write(&updated)?;
    info!(diagram = %id, "updated draft");
    Ok(updated)
}
