//! Error types for pattern compilation, catalog management and slot coercion

use thiserror::Error;

/// A template that cannot be turned into a matcher.
///
/// Fatal to the one pattern only: the owning intent stays in the catalog and
/// its remaining patterns keep working.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternCompilationError {
    #[error("unclosed '{{' at byte {position} in pattern '{template}'")]
    UnclosedPlaceholder { template: String, position: usize },

    #[error("unmatched '}}' at byte {position} in pattern '{template}'")]
    UnmatchedClose { template: String, position: usize },

    #[error("nested '{{' at byte {position} in pattern '{template}'")]
    NestedPlaceholder { template: String, position: usize },

    #[error("empty placeholder at byte {position} in pattern '{template}'")]
    EmptyPlaceholder { template: String, position: usize },

    #[error("invalid slot name '{name}' in pattern '{template}'")]
    InvalidSlotName { template: String, name: String },

    #[error("regex build failed for pattern '{template}': {message}")]
    Regex { template: String, message: String },
}

/// Rejected catalog mutation or definition. The catalog is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("intent '{0}' already exists")]
    DuplicateIntent(String),

    #[error("intent '{0}' does not exist")]
    UnknownIntent(String),

    #[error("invalid definition for intent '{id}': {reason}")]
    InvalidDefinition { id: String, reason: String },
}

impl CatalogError {
    /// The intent id the error refers to
    pub fn intent_id(&self) -> &str {
        match self {
            CatalogError::DuplicateIntent(id) | CatalogError::UnknownIntent(id) => id,
            CatalogError::InvalidDefinition { id, .. } => id,
        }
    }
}

/// A captured value that does not satisfy its slot declaration.
///
/// Recovered locally by treating the slot as absent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("{value} is outside [{min:?}, {max:?}]")]
    OutOfRange {
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },

    #[error("'{value}' is shorter than {min_length} characters")]
    TooShort { value: String, min_length: usize },

    #[error("'{0}' is not a recognised boolean")]
    NotABoolean(String),

    #[error("'{0}' is not a recognised date")]
    NotADate(String),

    #[error("date '{value}' is outside the allowed range")]
    DateOutOfRange { value: String },

    #[error("empty value")]
    Empty,
}

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown detection method '{0}'")]
    UnknownMethod(String),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
