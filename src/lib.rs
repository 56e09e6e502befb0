//! Intent engine - pattern-based intent detection and slot extraction
//!
//! Templates such as `buscar {nombre_producto}` are compiled into anchored
//! matchers that recover slot values from user text. A cheaper word-overlap
//! ranker surfaces candidate intents, and an optional secondary classifier
//! can be merged in under confidence thresholds.

pub mod catalog;
pub mod classifier;
pub mod config;
pub mod detector;
pub mod error;
pub mod keywords;
pub mod logging;
pub mod matcher;
pub mod pattern;
pub mod similarity;
pub mod types;
pub mod validation;

pub use catalog::{CatalogSnapshot, IntentCatalog, IntentEntry};
pub use classifier::{Classification, ClassifierError, SecondaryClassifier};
pub use config::{DetectionConfig, DetectionMethod};
pub use detector::{DetectionResult, HybridDecision, IntentEngine, MethodComparison};
pub use error::{CatalogError, ConfigError, PatternCompilationError, ValidationError};
pub use keywords::KeywordExtractor;
pub use matcher::{best_match, rank_candidates};
pub use pattern::{extract_slots, CompiledPattern, SlotCaptures, SlotMatch};
pub use types::*;
pub use validation::{coerce, resolve_parameters, validate};

// Python bindings
#[cfg(feature = "python")]
pub mod py;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn intent_engine(m: &Bound<'_, PyModule>) -> PyResult<()> {
    use py::*;
    logging::init_tracing();
    m.add_class::<PyIntentEngine>()?;
    m.add_function(wrap_pyfunction!(compile_pattern_slots, m)?)?;
    Ok(())
}
