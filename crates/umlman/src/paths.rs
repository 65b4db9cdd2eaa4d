use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ErrorKind, UmlError, codes};
use crate::model::{DiagramType, Location};
use crate::version::Version;

pub const MAX_NAME_LEN: usize = 100;

/// Names that would collide with layout directories or platform device names.
pub const RESERVED_NAMES: [&str; 9] = [
    "in-progress",
    "products",
    "nested",
    ".",
    "..",
    "CON",
    "PRN",
    "AUX",
    "NUL",
];

fn name_regex() -> &'static Regex {
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    NAME_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("valid name regex"))
}

/// Maps diagram identities onto the on-disk layout under a single root:
///
/// ```text
/// <root>/in-progress/<typeDir>/<name>-<version>.<ext>
/// <root>/products/<typeDir>/<name>-<version>.<ext>
/// ```
///
/// All checks are lexical; symlinks are never resolved here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathManager {
    root: PathBuf,
}

impl PathManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding diagrams of `diagram_type` at `location`.
    pub fn location_path(&self, location: Location, diagram_type: DiagramType) -> PathBuf {
        self.root
            .join(location.dir_name())
            .join(diagram_type.dir_name())
    }

    pub fn file_path(
        &self,
        diagram_type: DiagramType,
        name: &str,
        version: &Version,
        location: Location,
    ) -> Result<PathBuf, UmlError> {
        let file_name = Self::build_file_name(diagram_type, name, version)?;
        let path = self.location_path(location, diagram_type).join(file_name);
        self.validate_path(&path)?;
        Ok(path)
    }

    pub fn validate_name(name: &str) -> Result<(), UmlError> {
        if name.is_empty() {
            return Err(UmlError::validation(codes::EMPTY_NAME, "name must not be empty"));
        }

        if name.chars().count() > MAX_NAME_LEN {
            return Err(UmlError::validation(
                codes::NAME_TOO_LONG,
                format!("name exceeds {MAX_NAME_LEN} characters"),
            )
            .with_context("name", name));
        }

        if RESERVED_NAMES
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(name))
        {
            return Err(UmlError::validation(
                codes::RESERVED_NAME,
                format!("`{name}` is a reserved name"),
            )
            .with_context("name", name));
        }

        if !name_regex().is_match(name) {
            return Err(UmlError::validation(
                codes::INVALID_NAME,
                format!("`{name}` must match [A-Za-z0-9][A-Za-z0-9_-]*"),
            )
            .with_context("name", name));
        }

        Ok(())
    }

    /// Rejects any path spelling `..` below the root and any path that does not
    /// stay under the root. The root itself may contain `..`.
    pub fn validate_path(&self, path: &Path) -> Result<(), UmlError> {
        let below_root = path.strip_prefix(&self.root).unwrap_or(path);
        if below_root.to_string_lossy().contains("..") {
            let display = path.to_string_lossy();
            return Err(UmlError::validation(
                codes::PATH_TRAVERSAL,
                format!("path `{display}` contains `..`"),
            )
            .with_context("filePath", display.as_ref()));
        }

        let root = normalize(&self.root)?;
        let candidate = normalize(path)?;
        if !candidate.starts_with(&root) {
            return Err(UmlError::validation(
                codes::PATH_OUTSIDE_ROOT,
                format!(
                    "path `{}` resolves outside root `{}`",
                    candidate.display(),
                    root.display()
                ),
            )
            .with_context("filePath", candidate.display())
            .with_context("root", root.display()));
        }

        Ok(())
    }

    pub fn build_file_name(
        diagram_type: DiagramType,
        name: &str,
        version: &Version,
    ) -> Result<String, UmlError> {
        if name.is_empty() {
            return Err(UmlError::validation(codes::EMPTY_NAME, "name must not be empty"));
        }
        let version = version.to_string();
        if version.is_empty() {
            return Err(UmlError::validation(
                codes::EMPTY_VERSION,
                "version must not be empty",
            ));
        }
        Ok(format!("{name}-{version}.{}", diagram_type.extension()))
    }

    /// Splits `<name>-<version>.<ext>` back into its parts.
    pub fn parse_file_name(
        diagram_type: DiagramType,
        file_name: &str,
    ) -> Result<(String, Version), UmlError> {
        let suffix = format!(".{}", diagram_type.extension());
        let base = file_name.strip_suffix(&suffix).ok_or_else(|| {
            UmlError::validation(
                codes::INVALID_FILE_NAME,
                format!("`{file_name}` does not end in `{suffix}`"),
            )
            .with_context("fileName", file_name)
        })?;

        split_name_version(base).ok_or_else(|| {
            UmlError::validation(
                codes::INVALID_FILE_NAME,
                format!("`{file_name}` is not of the form <name>-<version>{suffix}"),
            )
            .with_context("fileName", file_name)
        })
    }

    /// Same right-to-left split as [`PathManager::parse_file_name`], without an extension.
    pub fn parse_directory_name(dir_name: &str) -> Result<(String, Version), UmlError> {
        split_name_version(dir_name).ok_or_else(|| {
            UmlError::validation(
                codes::INVALID_FILE_NAME,
                format!("`{dir_name}` is not of the form <name>-<version>"),
            )
            .with_context("directory", dir_name)
        })
    }

    /// Decomposes `<root>/<location>/<typeDir>/<file>` into identity and location.
    pub fn parse_full_path(
        &self,
        diagram_type: DiagramType,
        full_path: &Path,
    ) -> Result<(String, Version, Location), UmlError> {
        self.validate_path(full_path)?;

        let root = normalize(&self.root)?;
        let candidate = normalize(full_path)?;
        let relative = candidate.strip_prefix(&root).map_err(|_| {
            UmlError::validation(
                codes::PATH_OUTSIDE_ROOT,
                format!("`{}` is not under the root", full_path.display()),
            )
        })?;

        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let invalid = || {
            UmlError::validation(
                codes::INVALID_FILE_NAME,
                format!(
                    "`{}` is not of the form <root>/<location>/{}/<file>",
                    full_path.display(),
                    diagram_type.dir_name()
                ),
            )
            .with_context("filePath", full_path.display())
        };

        let [location_dir, type_dir, file_name] = parts.as_slice() else {
            return Err(invalid());
        };
        let location = Location::from_dir_name(location_dir).ok_or_else(invalid)?;
        if type_dir != diagram_type.dir_name() {
            return Err(invalid());
        }

        let (name, version) = Self::parse_file_name(diagram_type, file_name)?;
        Ok((name, version, location))
    }
}

/// Tries split points from right to left and keeps the first whose suffix is a
/// version and whose prefix is a valid name. Both sides may contain `-`.
fn split_name_version(base: &str) -> Option<(String, Version)> {
    base.char_indices()
        .rev()
        .filter(|(_, c)| *c == '-')
        .find_map(|(idx, _)| {
            let (name, rest) = (&base[..idx], &base[idx + 1..]);
            let version = Version::parse(rest).ok()?;
            PathManager::validate_name(name).ok()?;
            Some((name.to_string(), version))
        })
}

/// Absolute, lexically normalized form; does not touch the filesystem.
fn normalize(path: &Path) -> Result<PathBuf, UmlError> {
    let absolute = std::path::absolute(path).map_err(|err| {
        UmlError::new(
            ErrorKind::FileSystem,
            format!("cannot make `{}` absolute", path.display()),
        )
        .with_source(err)
    })?;
    Ok(absolute
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect())
}
