use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::config::UmlConfig;
use crate::error::{ErrorKind, UmlError, codes};
use crate::model::{Diagram, DiagramId, DiagramMetadata, DiagramType, Location};
use crate::paths::PathManager;
use crate::storage::DiagramRepository;

const COMPONENT: &str = "filesystem_repository";

/// Stores each diagram as a plain file under the [`PathManager`] layout.
#[derive(Clone, Debug)]
pub struct FilesystemRepository {
    paths: PathManager,
    max_file_size: u64,
    backup_enabled: bool,
}

impl FilesystemRepository {
    pub fn new(paths: PathManager) -> Self {
        Self {
            paths,
            max_file_size: crate::config::DEFAULT_MAX_FILE_SIZE,
            backup_enabled: false,
        }
    }

    pub fn from_config(config: &UmlConfig) -> Self {
        Self::new(PathManager::new(config.root_directory.clone()))
            .with_max_file_size(config.max_file_size)
            .with_backups(config.backup_enabled)
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn with_backups(mut self, enabled: bool) -> Self {
        self.backup_enabled = enabled;
        self
    }

    pub fn paths(&self) -> &PathManager {
        &self.paths
    }

    fn path_for(&self, id: &DiagramId, location: Location) -> Result<PathBuf, UmlError> {
        self.paths
            .file_path(id.diagram_type, &id.name, &id.version, location)
    }

    fn ensure_size(&self, len: u64, path: &Path) -> Result<(), UmlError> {
        if len > self.max_file_size {
            return Err(UmlError::validation(
                codes::FILE_TOO_LARGE,
                format!(
                    "{} bytes exceeds the maximum of {} bytes",
                    len, self.max_file_size
                ),
            )
            .with_context("filePath", path.display())
            .with_context("size", len)
            .with_context("maxFileSize", self.max_file_size));
        }
        Ok(())
    }

    /// Regular file at `path`, `None` when absent. Symlinks are refused.
    fn regular_file(&self, path: &Path) -> Result<Option<fs::Metadata>, UmlError> {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if meta.file_type().is_symlink() {
            return Err(UmlError::new(
                ErrorKind::Permission,
                format!("refusing to follow symlink {}", path.display()),
            )
            .with_code(codes::SYMLINK_REFUSED));
        }
        if !meta.is_file() {
            return Err(UmlError::filesystem(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        Ok(Some(meta))
    }

    fn read_at(&self, id: &DiagramId, location: Location, path: &Path) -> Result<Diagram, UmlError> {
        let meta = self.regular_file(path)?.ok_or_else(|| {
            UmlError::not_found(format!("diagram {id} not found in {location}"))
        })?;
        self.ensure_size(meta.len(), path)?;

        let bytes = fs::read(path)?;
        self.ensure_size(bytes.len() as u64, path)?;
        let content = String::from_utf8(bytes).map_err(|err| {
            UmlError::new(
                ErrorKind::Corruption,
                format!("{} is not valid UTF-8", path.display()),
            )
            .with_source(err)
        })?;

        let modified: DateTime<Utc> = meta
            .modified()
            .map(DateTime::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(Diagram {
            diagram_type: id.diagram_type,
            name: id.name.clone(),
            version: id.version.clone(),
            content,
            location,
            references: Vec::new(),
            // No sidecar: creation time falls back to the file mtime.
            metadata: DiagramMetadata::at(modified),
        })
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

fn ensure_parent(path: &Path) -> Result<(), UmlError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn annotate(
    err: UmlError,
    operation: &str,
    id: &DiagramId,
    location: Location,
    path: Option<&Path>,
) -> UmlError {
    let err = err
        .tagged(operation, COMPONENT)
        .with_context("name", &id.name)
        .with_context("version", &id.version)
        .with_context("location", location);
    match path {
        Some(path) => err.with_context("filePath", path.display()),
        None => err,
    }
}

impl DiagramRepository for FilesystemRepository {
    fn read(&self, id: &DiagramId, location: Location) -> Result<Diagram, UmlError> {
        let path = self
            .path_for(id, location)
            .map_err(|err| annotate(err, "repository.read", id, location, None))?;
        self.read_at(id, location, &path)
            .map_err(|err| annotate(err, "repository.read", id, location, Some(&path)))
    }

    fn write(&self, diagram: &Diagram) -> Result<(), UmlError> {
        let id = diagram.id();
        let location = diagram.location;
        let path = self
            .path_for(&id, location)
            .map_err(|err| annotate(err, "repository.write", &id, location, None))?;

        let result = (|| -> Result<(), UmlError> {
            self.ensure_size(diagram.content.len() as u64, &path)?;
            ensure_parent(&path)?;

            if self.backup_enabled && self.regular_file(&path)?.is_some() {
                fs::copy(&path, sibling(&path, ".bak"))?;
            }

            // Stage next to the target so readers never see a half-written file.
            let staged = sibling(&path, ".tmp");
            fs::write(&staged, diagram.content.as_bytes())?;
            if let Err(err) = fs::rename(&staged, &path) {
                let _ = fs::remove_file(&staged);
                return Err(err.into());
            }
            Ok(())
        })();

        result.map_err(|err| annotate(err, "repository.write", &id, location, Some(&path)))
    }

    fn exists(&self, id: &DiagramId, location: Location) -> Result<bool, UmlError> {
        let path = self
            .path_for(id, location)
            .map_err(|err| annotate(err, "repository.exists", id, location, None))?;
        self.regular_file(&path)
            .map(|meta| meta.is_some())
            .map_err(|err| annotate(err, "repository.exists", id, location, Some(&path)))
    }

    fn list(&self, diagram_type: DiagramType, location: Location) -> Result<Vec<Diagram>, UmlError> {
        let dir = self.paths.location_path(location, diagram_type);
        self.paths.validate_path(&dir)?;

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(UmlError::from(err)
                    .tagged("repository.list", COMPONENT)
                    .with_context("location", location)
                    .with_context("filePath", dir.display()));
            }
        };

        let mut diagrams = Vec::new();
        for entry in entries {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if !file_type.is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let (name, version) = match PathManager::parse_file_name(diagram_type, &file_name) {
                Ok(parsed) => parsed,
                Err(_) => {
                    warn!(file = %file_name, %location, "skipping unrecognized entry");
                    continue;
                }
            };
            let id = DiagramId::new(diagram_type, name, version);
            diagrams.push(self.read(&id, location)?);
        }

        diagrams.sort_by(|a, b| (&a.name, &a.version).cmp(&(&b.name, &b.version)));
        Ok(diagrams)
    }

    fn move_diagram(&self, id: &DiagramId, from: Location, to: Location) -> Result<(), UmlError> {
        let source = self
            .path_for(id, from)
            .map_err(|err| annotate(err, "repository.move", id, from, None))?;
        let target = self
            .path_for(id, to)
            .map_err(|err| annotate(err, "repository.move", id, to, None))?;

        let result = (|| -> Result<(), UmlError> {
            if self.regular_file(&source)?.is_none() {
                return Err(UmlError::not_found(format!(
                    "diagram {id} not found in {from}"
                )));
            }
            if fs::symlink_metadata(&target).is_ok() {
                return Err(UmlError::new(
                    ErrorKind::FileConflict,
                    format!("diagram {id} already exists in {to}"),
                )
                .with_context("targetPath", target.display()));
            }
            ensure_parent(&target)?;

            if fs::rename(&source, &target).is_err() {
                // Cross-device moves: copy then remove, undoing the copy on failure.
                fs::copy(&source, &target)?;
                if let Err(err) = fs::remove_file(&source) {
                    let _ = fs::remove_file(&target);
                    return Err(err.into());
                }
            }
            Ok(())
        })();

        result.map_err(|err| {
            annotate(err, "repository.move", id, from, Some(&source))
                .with_context("destination", to)
        })
    }

    fn delete(&self, id: &DiagramId, location: Location) -> Result<(), UmlError> {
        let path = self
            .path_for(id, location)
            .map_err(|err| annotate(err, "repository.delete", id, location, None))?;

        let result = (|| -> Result<(), UmlError> {
            if self.regular_file(&path)?.is_none() {
                return Err(UmlError::not_found(format!(
                    "diagram {id} not found in {location}"
                )));
            }
            fs::remove_file(&path)?;
            match fs::remove_file(sibling(&path, ".bak")) {
                Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
                _ => Ok(()),
            }
        })();

        result.map_err(|err| annotate(err, "repository.delete", id, location, Some(&path)))
    }

    fn create_directory(&self, path: &Path) -> Result<(), UmlError> {
        self.paths.validate_path(path)?;
        fs::create_dir_all(path).map_err(|err| {
            UmlError::from(err)
                .tagged("repository.create_directory", COMPONENT)
                .with_context("filePath", path.display())
        })
    }

    fn directory_exists(&self, path: &Path) -> Result<bool, UmlError> {
        self.paths.validate_path(path)?;
        match fs::symlink_metadata(path) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(UmlError::from(err)
                .tagged("repository.directory_exists", COMPONENT)
                .with_context("filePath", path.display())),
        }
    }
}
