//! Python bindings for the intent engine using PyO3

use crate::catalog::IntentCatalog;
use crate::config::{builtin_catalog, load_catalog_str, DetectionConfig, DetectionMethod};
use crate::detector::{DetectionResult, IntentEngine};
use crate::pattern::CompiledPattern;
use crate::types::{IntentDefinition, IntentPatch};
use pyo3::exceptions::{PyKeyError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::sync::Arc;

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyErr::new::<PyValueError, _>(e.to_string())
}

fn parse_method(method: Option<&str>) -> PyResult<Option<DetectionMethod>> {
    method
        .map(|m| m.parse::<DetectionMethod>().map_err(value_error))
        .transpose()
}

/// Slot names of a template in capture order (Python function)
#[pyfunction]
pub fn compile_pattern_slots(template: &str) -> PyResult<Vec<String>> {
    CompiledPattern::compile(template)
        .map(|p| p.slot_names().to_vec())
        .map_err(value_error)
}

/// Python wrapper for the intent engine
#[pyclass(name = "IntentEngine")]
pub struct PyIntentEngine {
    engine: IntentEngine,
}

impl PyIntentEngine {
    fn catalog(&self) -> &IntentCatalog {
        self.engine.catalog()
    }

    fn result_dict<'py>(py: Python<'py>, result: &DetectionResult) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new_bound(py);
        dict.set_item("intent_id", result.intent_id.as_deref())?;
        dict.set_item("confidence", result.confidence)?;
        dict.set_item("pattern", result.pattern.as_deref())?;
        dict.set_item("original_text", &result.original_text)?;
        dict.set_item("method", result.method.as_str())?;
        // Typed slot values travel as JSON to keep numbers and booleans intact
        let parameters = serde_json::to_string(&result.parameters).map_err(|e| {
            value_error(format!("Failed to serialize parameters: {}", e))
        })?;
        dict.set_item("parameters", parameters)?;
        if let Some(decision) = result.decision {
            let decision = serde_json::to_value(decision).map_err(value_error)?;
            dict.set_item("decision", decision.as_str())?;
        }
        if let Some(error) = &result.error {
            dict.set_item("error", error)?;
        }
        Ok(dict)
    }
}

#[pymethods]
impl PyIntentEngine {
    /// Build from catalog/config JSON, defaulting to the built-in catalog and env settings
    #[new]
    #[pyo3(signature = (catalog_json=None, config_json=None))]
    fn new(catalog_json: Option<&str>, config_json: Option<&str>) -> PyResult<Self> {
        let catalog = match catalog_json {
            Some(json) => load_catalog_str(json),
            None => builtin_catalog(),
        }
        .map_err(value_error)?;
        let config = match config_json {
            Some(json) => DetectionConfig::from_json_str(json),
            None => DetectionConfig::from_env(),
        }
        .map_err(value_error)?;

        Ok(Self {
            engine: IntentEngine::new(Arc::new(catalog), config),
        })
    }

    /// Detect the intent of `text`
    #[pyo3(signature = (text, method=None))]
    fn detect<'py>(
        &self,
        py: Python<'py>,
        text: &str,
        method: Option<&str>,
    ) -> PyResult<Bound<'py, PyDict>> {
        let result = match parse_method(method)? {
            Some(method) => self.engine.detect_with(text, method),
            None => self.engine.detect(text),
        };
        Self::result_dict(py, &result)
    }

    /// Full detection result as a JSON string
    #[pyo3(signature = (text, method=None))]
    fn detect_json(&self, text: &str, method: Option<&str>) -> PyResult<String> {
        let result = match parse_method(method)? {
            Some(method) => self.engine.detect_with(text, method),
            None => self.engine.detect(text),
        };
        serde_json::to_string(&result).map_err(value_error)
    }

    /// Catalog export shape as a JSON string
    fn list_intents(&self) -> PyResult<String> {
        serde_json::to_string(&self.catalog().list_intents()).map_err(value_error)
    }

    /// Typed parameters for a given intent as a JSON string
    fn extract_parameters(&self, text: &str, intent_id: &str) -> PyResult<String> {
        let params = self.engine.extract_parameters(text, intent_id);
        serde_json::to_string(&params).map_err(value_error)
    }

    /// Add an intent from its JSON definition
    fn add_intent(&self, definition_json: &str) -> PyResult<()> {
        let definition: IntentDefinition =
            serde_json::from_str(definition_json).map_err(value_error)?;
        self.catalog().add_intent(definition).map_err(value_error)?;
        Ok(())
    }

    /// Merge a partial JSON definition into an existing intent
    fn patch_intent(&self, intent_id: &str, patch_json: &str) -> PyResult<()> {
        let patch: IntentPatch = serde_json::from_str(patch_json).map_err(value_error)?;
        self.catalog().patch_intent(intent_id, patch).map_err(value_error)?;
        Ok(())
    }

    /// Remove an intent by id
    fn remove_intent(&self, intent_id: &str) -> PyResult<()> {
        self.catalog()
            .remove_intent(intent_id)
            .map_err(|e| PyErr::new::<PyKeyError, _>(e.to_string()))?;
        Ok(())
    }

    /// Get number of intents
    fn __len__(&self) -> usize {
        self.catalog().len()
    }
}
