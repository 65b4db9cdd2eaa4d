//! Store configuration.
//!
//! Values come from defaults, an optional TOML file and `GO_UML_*` environment
//! variables, in increasing priority. Malformed individual values fall back to
//! their defaults instead of failing the whole load.
//!
//! ```toml
//! root_directory = "./diagrams"
//! validation_level = "in-progress"
//! backup_enabled = false
//! max_file_size = 10485760
//! enable_debug_logging = false
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config_crate::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, UmlError};
use crate::model::Location;

pub const ENV_PREFIX: &str = "GO_UML";
pub const DEFAULT_ROOT_DIRECTORY: &str = ".go-uml";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const KEY_ROOT: &str = "root_directory";
const KEY_LEVEL: &str = "validation_level";
const KEY_BACKUP: &str = "backup_enabled";
const KEY_MAX_SIZE: &str = "max_file_size";
const KEY_DEBUG: &str = "enable_debug_logging";
// `GO_UML_DEBUG_LOGGING` lands here once the prefix is stripped.
const KEY_DEBUG_ENV: &str = "debug_logging";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UmlConfig {
    /// Base of the on-disk layout.
    pub root_directory: PathBuf,
    /// Strictness for call sites that have no location of their own.
    pub validation_level: Location,
    /// Keep `<file>.bak` of the previous content on overwrite.
    pub backup_enabled: bool,
    /// Upper bound in bytes, enforced on read and write.
    pub max_file_size: u64,
    pub enable_debug_logging: bool,
}

impl Default for UmlConfig {
    fn default() -> Self {
        Self {
            root_directory: PathBuf::from(DEFAULT_ROOT_DIRECTORY),
            validation_level: Location::InProgress,
            backup_enabled: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            enable_debug_logging: false,
        }
    }
}

impl UmlConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root_directory: root.into(),
            ..Self::default()
        }
    }

    /// Reads `GO_UML_*` from the process environment.
    pub fn from_env() -> Result<Self, UmlError> {
        Self::load(None, None)
    }

    /// Same as [`UmlConfig::from_env`] but with an explicit variable map.
    pub fn from_env_vars(vars: HashMap<String, String>) -> Result<Self, UmlError> {
        Self::load(None, Some(vars))
    }

    /// TOML file overlaid by the process environment.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, UmlError> {
        Self::load(Some(path.as_ref()), None)
    }

    fn load(file: Option<&Path>, vars: Option<HashMap<String, String>>) -> Result<Self, UmlError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).source(vars));

        let raw = builder.build().map_err(|err| {
            UmlError::new(ErrorKind::Configuration, "failed to load configuration")
                .with_component("config")
                .with_source(err)
        })?;

        Ok(Self::from_raw(&raw))
    }

    fn from_raw(raw: &Config) -> Self {
        let defaults = Self::default();
        let text = |key: &str| raw.get_string(key).ok().map(|v| v.trim().to_string());

        let root_directory = text(KEY_ROOT)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.root_directory);

        let validation_level = text(KEY_LEVEL)
            .and_then(|v| v.parse::<Location>().ok())
            .unwrap_or(defaults.validation_level);

        let backup_enabled = text(KEY_BACKUP)
            .and_then(|v| parse_bool(&v))
            .unwrap_or(defaults.backup_enabled);

        let max_file_size = text(KEY_MAX_SIZE)
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|size| *size > 0)
            .map(|size| size as u64)
            .unwrap_or(defaults.max_file_size);

        let enable_debug_logging = text(KEY_DEBUG_ENV)
            .or_else(|| text(KEY_DEBUG))
            .and_then(|v| parse_bool(&v))
            .unwrap_or(defaults.enable_debug_logging);

        Self {
            root_directory,
            validation_level,
            backup_enabled,
            max_file_size,
            enable_debug_logging,
        }
    }

    pub fn validate(&self) -> Result<(), UmlError> {
        if self.root_directory.as_os_str().is_empty() {
            return Err(UmlError::new(
                ErrorKind::Configuration,
                "root directory must not be empty",
            )
            .with_component("config"));
        }
        if self.max_file_size == 0 {
            return Err(UmlError::new(
                ErrorKind::Configuration,
                "max file size must be positive",
            )
            .with_component("config"));
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
