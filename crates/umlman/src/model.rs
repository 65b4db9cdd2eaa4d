use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{UmlError, codes};
use crate::paths::PathManager;
use crate::version::Version;

/// Diagram notations the store knows how to lay out on disk.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DiagramType {
    #[default]
    Puml,
}

impl DiagramType {
    /// Directory under each location holding diagrams of this type.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Puml => "puml",
        }
    }

    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Puml => "puml",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Puml => "puml",
        }
    }
}

impl fmt::Display for DiagramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagramType {
    type Err = UmlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "puml" => Ok(Self::Puml),
            other => Err(UmlError::validation(
                codes::INVALID_FILE_NAME,
                format!("unknown diagram type `{other}`"),
            )),
        }
    }
}

/// The two on-disk trees a diagram may live in.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Location {
    #[default]
    InProgress,
    Products,
}

impl Location {
    pub const ALL: [Location; 2] = [Location::InProgress, Location::Products];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::InProgress => "in-progress",
            Self::Products => "products",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|loc| loc.dir_name() == name)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Location {
    type Err = UmlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in-progress" => Ok(Self::InProgress),
            "products" => Ok(Self::Products),
            other => Err(UmlError::validation(
                codes::INVALID_LOCATION,
                format!("unknown location `{other}`"),
            )),
        }
    }
}

/// Logical identity of a diagram: unique across both locations.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DiagramId {
    pub diagram_type: DiagramType,
    pub name: String,
    pub version: Version,
}

impl DiagramId {
    pub fn new(diagram_type: DiagramType, name: impl Into<String>, version: Version) -> Self {
        Self {
            diagram_type,
            name: name.into(),
            version,
        }
    }

    /// Validates caller-supplied name and version text and builds an identity.
    pub fn parse(diagram_type: DiagramType, name: &str, version: &str) -> Result<Self, UmlError> {
        PathManager::validate_name(name)?;
        let version = parse_version_input(version)?;
        Ok(Self::new(diagram_type, name, version))
    }
}

impl fmt::Display for DiagramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.diagram_type, self.name, self.version)
    }
}

pub(crate) fn parse_version_input(version: &str) -> Result<Version, UmlError> {
    if version.is_empty() {
        return Err(UmlError::validation(
            codes::EMPTY_VERSION,
            "version must not be empty",
        ));
    }
    Version::parse(version).map_err(|err| {
        UmlError::validation(codes::INVALID_VERSION, err.message().to_string())
            .with_context("version", version)
            .with_source(err)
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceType {
    Product,
}

/// Link from one diagram to a released diagram in the products tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    pub version: Version,
    pub reference_type: ReferenceType,
    /// Resolved on-disk target; `None` until resolution succeeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Reference {
    pub fn product(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            reference_type: ReferenceType::Product,
            path: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.path.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramMetadata {
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl DiagramMetadata {
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            created_at: timestamp,
            modified_at: timestamp,
            author: None,
            tags: Vec::new(),
        }
    }

    pub fn now() -> Self {
        Self::at(Utc::now())
    }
}

/// A PlantUML document together with its identity, placement and metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagram {
    pub diagram_type: DiagramType,
    pub name: String,
    pub version: Version,
    pub content: String,
    pub location: Location,
    #[serde(default)]
    pub references: Vec<Reference>,
    pub metadata: DiagramMetadata,
}

impl Diagram {
    pub fn new(id: DiagramId, content: impl Into<String>, location: Location) -> Self {
        Self {
            diagram_type: id.diagram_type,
            name: id.name,
            version: id.version,
            content: content.into(),
            location,
            references: Vec::new(),
            metadata: DiagramMetadata::now(),
        }
    }

    pub fn id(&self) -> DiagramId {
        DiagramId::new(self.diagram_type, self.name.clone(), self.version.clone())
    }

    /// Hex-encoded SHA-256 of the content.
    pub fn content_digest(&self) -> String {
        content_digest(&self.content)
    }
}

pub fn content_digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
