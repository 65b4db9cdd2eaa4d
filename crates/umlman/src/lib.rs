//! Versioned PlantUML state-machine diagrams with a two-stage lifecycle.
//!
//! Drafts live under `in-progress/`, released diagrams under `products/`:
//!
//! ```text
//! <root>/
//!   in-progress/puml/<name>-<version>.puml
//!   products/puml/<name>-<version>.puml
//! ```
//!
//! [`DiagramService`] is the entry point; [`ops`] holds the unlocked protocols.

pub mod config;
pub mod env;
pub mod error;
pub mod logging;
pub mod model;
pub mod ops;
pub mod paths;
pub mod service;
pub mod storage;
pub mod validation;
pub mod version;

pub use config::UmlConfig;
pub use env::UmlEnv;
pub use error::{ErrorKind, Result, Severity, UmlError, codes};
pub use logging::init_tracing;
pub use model::{
    Diagram, DiagramId, DiagramMetadata, DiagramType, Location, Reference, ReferenceType,
    content_digest,
};
pub use ops::CreateDiagramOptions;
pub use paths::PathManager;
pub use service::DiagramService;
pub use storage::{DiagramRepository, FilesystemRepository};
pub use validation::{
    Diagnostic, DiagramValidator, PlantUmlValidator, Strictness, VerificationResult,
    parse_product_references,
};
pub use version::Version;
