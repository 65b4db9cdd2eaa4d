use std::path::PathBuf;
use std::sync::Arc;

use crate::config::UmlConfig;
use crate::error::UmlError;
use crate::paths::PathManager;
use crate::storage::{DiagramRepository, FilesystemRepository};
use crate::validation::{DiagramValidator, PlantUmlValidator};

/// Shared components the lifecycle operations run against.
pub struct UmlEnv {
    pub config: UmlConfig,
    pub paths: PathManager,
    pub repository: Arc<dyn DiagramRepository>,
    pub validator: Arc<dyn DiagramValidator>,
}

impl UmlEnv {
    /// Filesystem repository and PlantUML validator configured from `config`.
    pub fn from_config(config: UmlConfig) -> Result<Self, UmlError> {
        let repository = Arc::new(FilesystemRepository::from_config(&config));
        Self::new(config, repository, Arc::new(PlantUmlValidator::new()))
    }

    /// Default configuration rooted at `root`.
    pub fn from_path(root: impl Into<PathBuf>) -> Result<Self, UmlError> {
        Self::from_config(UmlConfig::with_root(root))
    }

    /// Explicit collaborators, e.g. an alternative store or validator.
    pub fn new(
        config: UmlConfig,
        repository: Arc<dyn DiagramRepository>,
        validator: Arc<dyn DiagramValidator>,
    ) -> Result<Self, UmlError> {
        config.validate()?;
        let paths = PathManager::new(config.root_directory.clone());
        Ok(Self {
            config,
            paths,
            repository,
            validator,
        })
    }
}
