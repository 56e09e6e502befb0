//! Secondary statistical classifier capability
//!
//! The engine consults an injected scorer and merges its answer with the
//! pattern ranker. Any failure is treated as "no match" from that source.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Label and confidence returned by a secondary classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    #[error("classification failed: {0}")]
    Failed(String),
}

/// Anything able to score free text against the catalog's intent ids
pub trait SecondaryClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<Classification, ClassifierError>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "secondary"
    }
}

impl<F> SecondaryClassifier for F
where
    F: Fn(&str) -> Result<Classification, ClassifierError> + Send + Sync,
{
    fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        self(text)
    }
}
