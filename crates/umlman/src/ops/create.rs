use tracing::{debug, info};

use crate::env::UmlEnv;
use crate::error::{ErrorKind, UmlError, codes};
use crate::model::{Diagram, DiagramId, DiagramType, Location};
use crate::ops::{COMPONENT, identify, require_content};

const OPERATION: &str = "create";

#[derive(Clone, Debug, Default)]
pub struct CreateDiagramOptions {
    pub diagram_type: DiagramType,
    pub name: String,
    pub version: String,
    pub content: String,
    pub location: Location,
    pub author: Option<String>,
    pub tags: Vec<String>,
}

impl CreateDiagramOptions {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Writes a new draft. Identity must be free in both locations.
pub fn create_diagram(env: &UmlEnv, opts: CreateDiagramOptions) -> Result<Diagram, UmlError> {
    let id = DiagramId::parse(opts.diagram_type, &opts.name, &opts.version)
        .map_err(|err| err.tagged(OPERATION, COMPONENT))?;
    create_checked(env, &id, opts).map_err(|err| identify(err, OPERATION, &id))
}

fn create_checked(
    env: &UmlEnv,
    id: &DiagramId,
    opts: CreateDiagramOptions,
) -> Result<Diagram, UmlError> {
    require_content(&opts.content)?;
    env.paths
        .file_path(id.diagram_type, &id.name, &id.version, opts.location)?;

    for location in Location::ALL {
        if env.repository.exists(id, location)? {
            return Err(UmlError::new(
                ErrorKind::DirectoryConflict,
                format!("diagram {id} already exists in {location}"),
            )
            .with_context("location", location));
        }
    }

    if opts.location != Location::InProgress {
        return Err(UmlError::validation(
            codes::INVALID_LOCATION,
            "new diagrams must be created in progress; use promote to release",
        )
        .with_context("location", opts.location));
    }

    let mut diagram = Diagram::new(id.clone(), opts.content, Location::InProgress);
    diagram.metadata.author = opts.author;
    diagram.metadata.tags = opts.tags;

    debug!(diagram = %id, "writing new diagram");
    env.repository.write(&diagram)?;
    info!(diagram = %id, location = %diagram.location, "created diagram");
    Ok(diagram)
}
