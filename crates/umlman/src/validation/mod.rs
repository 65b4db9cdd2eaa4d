pub mod plantuml;
pub mod references;

use serde::{Deserialize, Serialize};

use crate::model::{Diagram, Location, Reference};

pub use plantuml::{CRITICAL_CODES, PlantUmlValidator};
pub use references::parse_product_references;

/// How hard validation findings bite.
///
/// Drafts are checked strictly; released products only keep critical
/// structural problems as errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strictness {
    Strict,
    Lenient,
}

impl Strictness {
    pub fn for_location(location: Location) -> Self {
        match location {
            Location::InProgress => Self::Strict,
            Location::Products => Self::Lenient,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    /// 1-based; 0 when the finding concerns the whole document.
    pub line: usize,
    /// 1-based; 0 when not applicable.
    pub column: usize,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
}

impl Diagnostic {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            line: 0,
            column: 0,
            context: String::new(),
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub is_valid: bool,
}

impl Default for VerificationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl VerificationResult {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            is_valid: true,
        }
    }

    pub fn push_error(&mut self, diagnostic: Diagnostic) {
        self.errors.push(diagnostic);
        self.is_valid = false;
    }

    pub fn push_warning(&mut self, diagnostic: Diagnostic) {
        self.warnings.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn error_codes(&self) -> Vec<&str> {
        self.errors.iter().map(|d| d.code.as_str()).collect()
    }

    pub fn warning_codes(&self) -> Vec<&str> {
        self.warnings.iter().map(|d| d.code.as_str()).collect()
    }
}

/// Checks diagram content. Implementations must be pure functions of their inputs.
pub trait DiagramValidator: Send + Sync {
    fn validate_content(&self, content: &str, strictness: Strictness) -> VerificationResult;

    fn validate(&self, diagram: &Diagram, strictness: Strictness) -> VerificationResult {
        self.validate_content(&diagram.content, strictness)
    }

    /// Syntactic well-formedness of the references declared in the content.
    fn validate_references(&self, diagram: &Diagram) -> VerificationResult;

    /// Product references declared in the content, in order of first appearance.
    fn parse_references(&self, diagram: &Diagram) -> Vec<Reference>;
}

impl<V> DiagramValidator for std::sync::Arc<V>
where
    V: DiagramValidator + ?Sized,
{
    fn validate_content(&self, content: &str, strictness: Strictness) -> VerificationResult {
        (**self).validate_content(content, strictness)
    }

    fn validate(&self, diagram: &Diagram, strictness: Strictness) -> VerificationResult {
        (**self).validate(diagram, strictness)
    }

    fn validate_references(&self, diagram: &Diagram) -> VerificationResult {
        (**self).validate_references(diagram)
    }

    fn parse_references(&self, diagram: &Diagram) -> Vec<Reference> {
        (**self).parse_references(diagram)
    }
}
