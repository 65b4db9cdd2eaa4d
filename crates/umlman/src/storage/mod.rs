pub mod filesystem;

use std::path::Path;
use std::sync::Arc;

use crate::error::UmlError;
use crate::model::{Diagram, DiagramId, DiagramType, Location};

pub use filesystem::FilesystemRepository;

/// Storage contract the lifecycle kernel depends on.
///
/// Implementations report a missing diagram as `ErrorKind::FileNotFound` and an
/// occupied move destination as `ErrorKind::FileConflict`.
pub trait DiagramRepository: Send + Sync {
    fn read(&self, id: &DiagramId, location: Location) -> Result<Diagram, UmlError>;

    /// Creates the containing directory when needed; overwrites an existing file.
    fn write(&self, diagram: &Diagram) -> Result<(), UmlError>;

    fn exists(&self, id: &DiagramId, location: Location) -> Result<bool, UmlError>;

    /// Diagrams whose file names parse; other entries are skipped.
    fn list(&self, diagram_type: DiagramType, location: Location) -> Result<Vec<Diagram>, UmlError>;

    /// Not required to be crash-atomic.
    fn move_diagram(&self, id: &DiagramId, from: Location, to: Location) -> Result<(), UmlError>;

    fn delete(&self, id: &DiagramId, location: Location) -> Result<(), UmlError>;

    fn create_directory(&self, path: &Path) -> Result<(), UmlError>;

    fn directory_exists(&self, path: &Path) -> Result<bool, UmlError>;
}

impl<R> DiagramRepository for Arc<R>
where
    R: DiagramRepository + ?Sized,
{
    fn read(&self, id: &DiagramId, location: Location) -> Result<Diagram, UmlError> {
        (**self).read(id, location)
    }

    fn write(&self, diagram: &Diagram) -> Result<(), UmlError> {
        (**self).write(diagram)
    }

    fn exists(&self, id: &DiagramId, location: Location) -> Result<bool, UmlError> {
        (**self).exists(id, location)
    }

    fn list(&self, diagram_type: DiagramType, location: Location) -> Result<Vec<Diagram>, UmlError> {
        (**self).list(diagram_type, location)
    }

    fn move_diagram(&self, id: &DiagramId, from: Location, to: Location) -> Result<(), UmlError> {
        (**self).move_diagram(id, from, to)
    }

    fn delete(&self, id: &DiagramId, location: Location) -> Result<(), UmlError> {
        (**self).delete(id, location)
    }

    fn create_directory(&self, path: &Path) -> Result<(), UmlError> {
        (**self).create_directory(path)
    }

    fn directory_exists(&self, path: &Path) -> Result<bool, UmlError> {
        (**self).directory_exists(path)
    }
}
