use std::collections::BTreeMap;
use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, UmlError>;

type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Stable codes attached to input-validation failures.
pub mod codes {
    pub const EMPTY_NAME: &str = "EMPTY_NAME";
    pub const EMPTY_VERSION: &str = "EMPTY_VERSION";
    pub const EMPTY_CONTENT: &str = "EMPTY_CONTENT";
    pub const INVALID_NAME: &str = "INVALID_NAME";
    pub const RESERVED_NAME: &str = "RESERVED_NAME";
    pub const NAME_TOO_LONG: &str = "NAME_TOO_LONG";
    pub const INVALID_VERSION: &str = "INVALID_VERSION";
    pub const INVALID_FILE_NAME: &str = "INVALID_FILE_NAME";
    pub const INVALID_LOCATION: &str = "INVALID_LOCATION";
    pub const PATH_TRAVERSAL: &str = "PATH_TRAVERSAL";
    pub const PATH_OUTSIDE_ROOT: &str = "PATH_OUTSIDE_ROOT";
    pub const SYMLINK_REFUSED: &str = "SYMLINK_REFUSED";
    pub const FILE_TOO_LARGE: &str = "FILE_TOO_LARGE";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const POSTCONDITION_FAILED: &str = "POSTCONDITION_FAILED";
}

/// Broad failure classes surfaced by the diagram store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    FileNotFound,
    DirectoryConflict,
    FileConflict,
    ReferenceResolution,
    ReferenceParsing,
    FileSystem,
    VersionParsing,
    Configuration,
    Permission,
    Timeout,
    Network,
    Corruption,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::FileNotFound => "file not found",
            Self::DirectoryConflict => "directory conflict",
            Self::FileConflict => "file conflict",
            Self::ReferenceResolution => "reference resolution",
            Self::ReferenceParsing => "reference parsing",
            Self::FileSystem => "filesystem",
            Self::VersionParsing => "version parsing",
            Self::Configuration => "configuration",
            Self::Permission => "permission",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Corruption => "corruption",
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            Self::Validation
            | Self::FileSystem
            | Self::Configuration
            | Self::Permission => Severity::High,
            Self::Corruption => Severity::Critical,
            _ => Severity::Medium,
        }
    }

    pub fn default_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound
                | Self::DirectoryConflict
                | Self::FileConflict
                | Self::ReferenceResolution
                | Self::Timeout
                | Self::Network
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Tagged error shared by the kernel, storage and validation layers.
#[derive(Debug, Error)]
#[error("{kind} error: {message}")]
pub struct UmlError {
    kind: ErrorKind,
    message: String,
    code: Option<String>,
    severity: Severity,
    recoverable: bool,
    operation: Option<String>,
    component: Option<String>,
    context: BTreeMap<String, String>,
    #[source]
    source: Option<BoxedCause>,
}

impl UmlError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            severity: kind.default_severity(),
            recoverable: kind.default_recoverable(),
            operation: None,
            component: None,
            context: BTreeMap::new(),
            source: None,
        }
    }

    pub fn validation(code: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message).with_code(code)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileNotFound, message)
    }

    pub fn filesystem(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileSystem, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    pub fn component(&self) -> Option<&str> {
        self.component.as_deref()
    }

    pub fn context_map(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_recoverable(mut self, recoverable: bool) -> Self {
        self.recoverable = recoverable;
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Tags the error with an operation/component pair unless a deeper layer already did.
    pub fn tagged(mut self, operation: &str, component: &str) -> Self {
        if self.operation.is_none() {
            self.operation = Some(operation.to_string());
        }
        if self.component.is_none() {
            self.component = Some(component.to_string());
        }
        self
    }

    pub fn context<T: fmt::Display>(mut self, ctx: T) -> Self {
        self.message = format!("{ctx}: {}", self.message);
        self
    }
}

impl From<io::Error> for UmlError {
    fn from(err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            io::ErrorKind::PermissionDenied => ErrorKind::Permission,
            io::ErrorKind::TimedOut => ErrorKind::Timeout,
            _ => ErrorKind::FileSystem,
        };
        UmlError::new(kind, err.to_string()).with_source(err)
    }
}
