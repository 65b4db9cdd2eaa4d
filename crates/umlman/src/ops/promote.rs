//! Release of a validated draft into the products tree.
//!
//! The sequence is: pre-checks, read, strict validation, move, post-condition
//! verification. When verification fails after the move the store is driven
//! back to "draft only" and the caller still gets a `FileSystem` error whose
//! context names the failed post-condition and the rollback outcome.

use std::fmt;

use tracing::{debug, error, info, warn};

use crate::env::UmlEnv;
use crate::error::{ErrorKind, UmlError, codes};
use crate::model::{Diagram, DiagramId, Location};
use crate::ops::identify;
use crate::validation::Strictness;

const OPERATION: &str = "promote";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Postcondition {
    ProductsPresent,
    InProgressAbsent,
    ContentDigest,
}

impl Postcondition {
    fn as_str(&self) -> &'static str {
        match self {
            Self::ProductsPresent => "products_exists",
            Self::InProgressAbsent => "in_progress_absent",
            Self::ContentDigest => "content_digest",
        }
    }
}

impl fmt::Display for Postcondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Violation {
    postcondition: Postcondition,
    cause: Option<UmlError>,
}

impl Violation {
    fn new(postcondition: Postcondition) -> Self {
        Self {
            postcondition,
            cause: None,
        }
    }

    fn caused_by(postcondition: Postcondition, cause: UmlError) -> Self {
        Self {
            postcondition,
            cause: Some(cause),
        }
    }
}

/// Moves a draft that passes strict validation into products.
///
/// Returns the released diagram as read back from products.
pub fn promote_diagram(env: &UmlEnv, id: &DiagramId) -> Result<Diagram, UmlError> {
    promote_checked(env, id).map_err(|err| identify(err, OPERATION, id))
}

fn promote_checked(env: &UmlEnv, id: &DiagramId) -> Result<Diagram, UmlError> {
    for location in Location::ALL {
        env.paths
            .file_path(id.diagram_type, &id.name, &id.version, location)?;
    }

    if !env.repository.exists(id, Location::InProgress)? {
        return Err(UmlError::new(
            ErrorKind::FileNotFound,
            format!("diagram {id} not found in {}", Location::InProgress),
        )
        .with_context("location", Location::InProgress));
    }
    if env.repository.exists(id, Location::Products)? {
        return Err(UmlError::new(
            ErrorKind::DirectoryConflict,
            format!("diagram {id} is already released"),
        )
        .with_context("location", Location::Products));
    }

    let draft = env.repository.read(id, Location::InProgress)?;
    let verdict = env.validator.validate(&draft, Strictness::Strict);
    if verdict.has_errors() {
        let failed = verdict.error_codes().join(",");
        debug!(diagram = %id, errors = %failed, "promotion blocked by validation");
        return Err(UmlError::validation(
            codes::VALIDATION_FAILED,
            format!(
                "diagram {id} has {} validation error(s) and cannot be promoted",
                verdict.errors.len()
            ),
        )
        .with_context("errors", failed));
    }

    let digest = draft.content_digest();
    env.repository
        .move_diagram(id, Location::InProgress, Location::Products)
        .map_err(|err| {
            UmlError::filesystem(format!("failed to move diagram {id} into products"))
                .with_context("step", "move")
                .with_source(err)
        })?;

    match verify(env, id, &digest) {
        Ok(released) => {
            info!(diagram = %id, digest = %digest, "promoted diagram to products");
            Ok(released)
        }
        Err(violation) => Err(roll_back(env, &draft, &digest, violation)),
    }
}

fn verify(env: &UmlEnv, id: &DiagramId, digest: &str) -> Result<Diagram, Violation> {
    match env.repository.exists(id, Location::Products) {
        Ok(true) => {}
        Ok(false) => return Err(Violation::new(Postcondition::ProductsPresent)),
        Err(err) => return Err(Violation::caused_by(Postcondition::ProductsPresent, err)),
    }
    match env.repository.exists(id, Location::InProgress) {
        Ok(false) => {}
        Ok(true) => return Err(Violation::new(Postcondition::InProgressAbsent)),
        Err(err) => return Err(Violation::caused_by(Postcondition::InProgressAbsent, err)),
    }
    let released = env
        .repository
        .read(id, Location::Products)
        .map_err(|err| Violation::caused_by(Postcondition::ContentDigest, err))?;
    if released.content_digest() != digest {
        return Err(Violation::new(Postcondition::ContentDigest));
    }
    Ok(released)
}

fn roll_back(env: &UmlEnv, draft: &Diagram, digest: &str, violation: Violation) -> UmlError {
    let id = draft.id();
    let postcondition = violation.postcondition;
    warn!(diagram = %id, %postcondition, "promotion post-condition failed; rolling back");

    let mut err = UmlError::filesystem(format!(
        "promotion of {id} left the store inconsistent ({postcondition} failed)"
    ))
    .with_code(codes::POSTCONDITION_FAILED)
    .with_context("postcondition", postcondition);
    if let Some(cause) = violation.cause {
        err = err.with_source(cause);
    }

    match restore_draft(env, draft, digest) {
        Ok(()) => {
            info!(diagram = %id, "rollback restored the draft");
            err.with_context("rollback", "succeeded")
        }
        Err(rollback_err) => {
            error!(diagram = %id, error = %rollback_err, "rollback failed");
            err.with_context("rollback", "failed")
                .with_context("rollbackError", rollback_err.message())
        }
    }
}

/// Drives the store back to "draft only, with the validated content".
fn restore_draft(env: &UmlEnv, draft: &Diagram, digest: &str) -> Result<(), UmlError> {
    let id = draft.id();
    let in_progress = env.repository.exists(&id, Location::InProgress)?;
    let released = env.repository.exists(&id, Location::Products)?;

    match (in_progress, released) {
        (false, true) => {
            env.repository
                .move_diagram(&id, Location::Products, Location::InProgress)?;
        }
        (true, true) => env.repository.delete(&id, Location::Products)?,
        _ => {}
    }

    let intact = env.repository.exists(&id, Location::InProgress)?
        && env
            .repository
            .read(&id, Location::InProgress)?
            .content_digest()
            == digest;
    if !intact {
        env.repository.write(draft)?;
    }

    if env.repository.exists(&id, Location::Products)? {
        return Err(UmlError::filesystem(format!(
            "diagram {id} is still present in products"
        )));
    }
    Ok(())
}
