use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::UmlConfig;
use crate::env::UmlEnv;
use crate::error::UmlError;
use crate::logging::init_tracing;
use crate::model::{Diagram, DiagramId, DiagramType, Location};
use crate::ops::{self, CreateDiagramOptions};
use crate::storage::DiagramRepository;
use crate::validation::{DiagramValidator, VerificationResult};

/// Thread-safe entry point for the diagram lifecycle.
///
/// Mutations (create, update, delete, promote) hold the write lock for their
/// whole duration; reads, listings, validation and reference resolution share
/// the read lock. The lock only orders callers of this instance; other
/// processes touching the same tree are not coordinated.
pub struct DiagramService {
    env: UmlEnv,
    lock: RwLock<()>,
}

impl DiagramService {
    /// Default configuration rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, UmlError> {
        Self::with_config(UmlConfig::with_root(root))
    }

    pub fn with_config(config: UmlConfig) -> Result<Self, UmlError> {
        Ok(Self::from_env_parts(UmlEnv::from_config(config)?))
    }

    /// Loads `GO_UML_*` variables and installs the tracing subscriber.
    pub fn from_env() -> Result<Self, UmlError> {
        Self::from_loaded_config(UmlConfig::from_env()?)
    }

    /// [`DiagramService::from_env`] over an explicit variable map.
    pub fn from_env_vars(vars: HashMap<String, String>) -> Result<Self, UmlError> {
        Self::from_loaded_config(UmlConfig::from_env_vars(vars)?)
    }

    fn from_loaded_config(config: UmlConfig) -> Result<Self, UmlError> {
        init_tracing(config.enable_debug_logging);
        Self::with_config(config)
    }

    /// Alternative collaborators, e.g. an in-memory store in tests.
    pub fn with_components(
        config: UmlConfig,
        repository: Arc<dyn DiagramRepository>,
        validator: Arc<dyn DiagramValidator>,
    ) -> Result<Self, UmlError> {
        Ok(Self::from_env_parts(UmlEnv::new(
            config, repository, validator,
        )?))
    }

    fn from_env_parts(env: UmlEnv) -> Self {
        debug!(root = %env.paths.root().display(), "diagram service ready");
        Self {
            env,
            lock: RwLock::new(()),
        }
    }

    pub fn config(&self) -> &UmlConfig {
        &self.env.config
    }

    pub fn create_file(
        &self,
        diagram_type: DiagramType,
        name: &str,
        version: &str,
        content: &str,
        location: Location,
    ) -> Result<Diagram, UmlError> {
        self.create(CreateDiagramOptions {
            diagram_type,
            location,
            ..CreateDiagramOptions::new(name, version, content)
        })
    }

    /// Create with author and tags.
    pub fn create(&self, opts: CreateDiagramOptions) -> Result<Diagram, UmlError> {
        let _guard = self.lock.write();
        ops::create_diagram(&self.env, opts)
    }

    pub fn read_file(
        &self,
        diagram_type: DiagramType,
        name: &str,
        version: &str,
        location: Location,
    ) -> Result<Diagram, UmlError> {
        let id = parse_id(diagram_type, name, version, "read")?;
        let _guard = self.lock.read();
        ops::read_diagram(&self.env, &id, location)
    }

    pub fn update_in_progress_file(&self, diagram: &Diagram) -> Result<Diagram, UmlError> {
        let _guard = self.lock.write();
        ops::update_in_progress(&self.env, diagram)
    }

    pub fn delete_file(
        &self,
        diagram_type: DiagramType,
        name: &str,
        version: &str,
        location: Location,
    ) -> Result<(), UmlError> {
        let id = parse_id(diagram_type, name, version, "delete")?;
        let _guard = self.lock.write();
        ops::delete_diagram(&self.env, &id, location)
    }

    pub fn list_all_files(
        &self,
        diagram_type: DiagramType,
        location: Location,
    ) -> Result<Vec<Diagram>, UmlError> {
        let _guard = self.lock.read();
        ops::list_diagrams(&self.env, diagram_type, location)
    }

    pub fn validate_file(
        &self,
        diagram_type: DiagramType,
        name: &str,
        version: &str,
        location: Location,
    ) -> Result<VerificationResult, UmlError> {
        let id = parse_id(diagram_type, name, version, "validate")?;
        let _guard = self.lock.read();
        ops::validate_diagram(&self.env, &id, location)
    }

    /// Validates text that is not stored, at the configured default level.
    pub fn validate_content(&self, content: &str) -> VerificationResult {
        ops::validate_content(&self.env, content)
    }

    pub fn promote_to_products_file(
        &self,
        diagram_type: DiagramType,
        name: &str,
        version: &str,
    ) -> Result<Diagram, UmlError> {
        let id = parse_id(diagram_type, name, version, "promote")?;
        let _guard = self.lock.write();
        ops::promote_diagram(&self.env, &id)
    }

    pub fn resolve_file_references(&self, diagram: &Diagram) -> Result<Diagram, UmlError> {
        let _guard = self.lock.read();
        ops::resolve_references(&self.env, diagram)
    }
}

fn parse_id(
    diagram_type: DiagramType,
    name: &str,
    version: &str,
    operation: &str,
) -> Result<DiagramId, UmlError> {
    DiagramId::parse(diagram_type, name, version)
        .map_err(|err| err.tagged(operation, ops::COMPONENT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ops::testing::VALID;
    use tempfile::tempdir;

    #[test]
    fn service_round_trips_a_draft() {
        let temp = tempdir().unwrap();
        let service = DiagramService::new(temp.path()).unwrap();

        service
            .create_file(DiagramType::Puml, "auth", "1.0.0", VALID, Location::InProgress)
            .unwrap();
        let read = service
            .read_file(DiagramType::Puml, "auth", "1.0.0", Location::InProgress)
            .unwrap();
        assert_eq!(read.content, VALID);

        let listed = service
            .list_all_files(DiagramType::Puml, Location::InProgress)
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn malformed_identity_is_rejected_before_locking() {
        let temp = tempdir().unwrap();
        let service = DiagramService::new(temp.path()).unwrap();
        let err = service
            .read_file(DiagramType::Puml, "../etc", "1.0.0", Location::InProgress)
            .expect_err("bad name");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.operation(), Some("read"));
    }

    #[test]
    fn invalid_config_is_refused() {
        let mut config = UmlConfig::default();
        config.max_file_size = 0;
        let err = DiagramService::with_config(config)
            .err()
            .expect("zero max size");
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
