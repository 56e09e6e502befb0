//! Detection orchestration
//!
//! Combines the pattern ranker, anchored slot extraction, coercion and an
//! optional secondary classifier into one `detect` call. Each call works on a
//! single catalog snapshot.

use crate::catalog::{CatalogSnapshot, IntentCatalog};
use crate::classifier::{Classification, ClassifierError, SecondaryClassifier};
use crate::config::{DetectionConfig, DetectionMethod};
use crate::keywords::KeywordExtractor;
use crate::matcher::{alternatives, rank_candidates};
use crate::pattern::extract_slots;
use crate::types::{ExtractedParameters, MatchCandidate};
use crate::validation::resolve_parameters;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Which source a hybrid detection trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HybridDecision {
    PatternHighConfidence,
    SecondaryHighConfidence,
    BestOfBoth,
    PatternFallback,
}

/// Outcome of one detection.
///
/// "No intent" is a normal result: `intent_id` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub intent_id: Option<String>,
    pub confidence: f64,
    pub pattern: Option<String>,
    pub parameters: ExtractedParameters,
    pub original_text: String,
    pub method: DetectionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<HybridDecision>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<MatchCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectionResult {
    pub fn none(text: &str, method: DetectionMethod, confidence: f64) -> Self {
        Self {
            intent_id: None,
            confidence,
            pattern: None,
            parameters: ExtractedParameters::new(),
            original_text: text.to_string(),
            method,
            decision: None,
            alternatives: Vec::new(),
            pattern_confidence: None,
            secondary_confidence: None,
            error: None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.intent_id.is_some()
    }
}

/// One method's result with its wall-clock cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodComparison {
    pub method: DetectionMethod,
    pub result: DetectionResult,
    pub elapsed_micros: u64,
}

pub struct IntentEngine {
    catalog: Arc<IntentCatalog>,
    classifier: Option<Arc<dyn SecondaryClassifier>>,
    keywords: KeywordExtractor,
    config: DetectionConfig,
}

impl IntentEngine {
    pub fn new(catalog: Arc<IntentCatalog>, config: DetectionConfig) -> Self {
        Self {
            catalog,
            classifier: None,
            keywords: KeywordExtractor::new(),
            config,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn SecondaryClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_keywords(mut self, keywords: KeywordExtractor) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn catalog(&self) -> &Arc<IntentCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Detect with the configured default method
    pub fn detect(&self, text: &str) -> DetectionResult {
        self.detect_with(text, self.config.default_method)
    }

    pub fn detect_with(&self, text: &str, method: DetectionMethod) -> DetectionResult {
        let snapshot = self.catalog.snapshot();
        let result = match method {
            DetectionMethod::Pattern => self.detect_pattern(&snapshot, text),
            DetectionMethod::Secondary => self.detect_secondary(&snapshot, text),
            DetectionMethod::Hybrid => self.detect_hybrid(&snapshot, text),
        };

        debug!(
            method = %method,
            intent = result.intent_id.as_deref().unwrap_or("none"),
            confidence = result.confidence,
            "detection finished"
        );
        result
    }

    /// Typed parameters for a known intent, or empty if the id is unknown
    pub fn extract_parameters(&self, text: &str, intent_id: &str) -> ExtractedParameters {
        self.parameters_for(&self.catalog.snapshot(), text, intent_id)
    }

    /// Run every method on the same input
    pub fn compare_methods(&self, text: &str) -> Vec<MethodComparison> {
        DetectionMethod::ALL
            .iter()
            .map(|&method| {
                let started = Instant::now();
                let result = self.detect_with(text, method);
                MethodComparison {
                    method,
                    result,
                    elapsed_micros: started.elapsed().as_micros() as u64,
                }
            })
            .collect()
    }

    fn parameters_for(
        &self,
        snapshot: &CatalogSnapshot,
        text: &str,
        intent_id: &str,
    ) -> ExtractedParameters {
        let Some(entry) = snapshot.entry(intent_id) else {
            return ExtractedParameters::new();
        };
        let schema = &entry.definition().parameters;

        let mut captures = extract_slots(text, entry.compiled_patterns())
            .map(|m| m.slots)
            .unwrap_or_default();
        if self.config.keyword_fallback {
            self.keywords.fill_missing(text, schema, &mut captures);
        }

        resolve_parameters(&captures, schema)
    }

    fn detect_pattern(&self, snapshot: &CatalogSnapshot, text: &str) -> DetectionResult {
        let candidates = rank_candidates(text, snapshot);
        let Some(best) = candidates.first() else {
            return DetectionResult::none(text, DetectionMethod::Pattern, 0.0);
        };

        let score = best.confidence_score;
        let mut accepted = score >= self.config.pattern_min_confidence;
        if accepted && self.config.respect_intent_thresholds {
            accepted = snapshot
                .get(&best.intent_id)
                .is_some_and(|d| score >= d.confidence_threshold);
        }

        let mut result = DetectionResult::none(text, DetectionMethod::Pattern, score);
        result.pattern = Some(best.pattern.clone());
        result.alternatives = alternatives(
            &candidates,
            Some(best.intent_id.as_str()),
            self.config.max_alternatives,
        );

        if accepted {
            result.parameters = self.parameters_for(snapshot, text, &best.intent_id);
            result.intent_id = Some(best.intent_id.clone());
        }
        result
    }

    fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        match &self.classifier {
            Some(classifier) => classifier.classify(text),
            None => Err(ClassifierError::Unavailable(
                "no secondary classifier configured".to_string(),
            )),
        }
    }

    fn detect_secondary(&self, snapshot: &CatalogSnapshot, text: &str) -> DetectionResult {
        match self.classify(text) {
            Ok(classification) => self.secondary_result(snapshot, text, &classification),
            Err(e) => {
                debug!(error = %e, "secondary classifier gave no answer");
                let mut result = DetectionResult::none(text, DetectionMethod::Secondary, 0.0);
                result.error = Some(e.to_string());
                result
            }
        }
    }

    fn secondary_result(
        &self,
        snapshot: &CatalogSnapshot,
        text: &str,
        classification: &Classification,
    ) -> DetectionResult {
        let confidence = classification.confidence;
        let mut result = DetectionResult::none(text, DetectionMethod::Secondary, confidence);
        if confidence < self.config.secondary_min_confidence {
            return result;
        }

        match snapshot.normalize_intent(&classification.label) {
            Some(intent_id) => {
                result.parameters = self.parameters_for(snapshot, text, &intent_id);
                result.intent_id = Some(intent_id);
            }
            None => warn!(label = %classification.label, "classifier label is not a catalog intent"),
        }
        result
    }

    fn detect_hybrid(&self, snapshot: &CatalogSnapshot, text: &str) -> DetectionResult {
        let pattern = self.detect_pattern(snapshot, text);

        let classification = match self.classify(text) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "hybrid detection falling back to patterns");
                let mut result = pattern;
                result.method = DetectionMethod::Hybrid;
                result.decision = Some(HybridDecision::PatternFallback);
                result.pattern_confidence = Some(result.confidence);
                result.error = Some(e.to_string());
                return result;
            }
        };
        let secondary = self.secondary_result(snapshot, text, &classification);

        let pattern_confidence = pattern.confidence;
        let secondary_confidence = secondary.confidence;
        let (mut result, decision) = if pattern_confidence >= self.config.hybrid_pattern_threshold {
            (pattern, HybridDecision::PatternHighConfidence)
        } else if secondary_confidence >= self.config.hybrid_secondary_threshold {
            (secondary, HybridDecision::SecondaryHighConfidence)
        } else if pattern_confidence > secondary_confidence {
            (pattern, HybridDecision::BestOfBoth)
        } else {
            (secondary, HybridDecision::BestOfBoth)
        };

        debug!(?decision, pattern_confidence, secondary_confidence, "hybrid decision");
        result.method = DetectionMethod::Hybrid;
        result.decision = Some(decision);
        result.pattern_confidence = Some(pattern_confidence);
        result.secondary_confidence = Some(secondary_confidence);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IntentDefinition, SlotSpec, SlotValue};

    fn catalog() -> Arc<IntentCatalog> {
        Arc::new(
            IntentCatalog::from_definitions(vec![
                IntentDefinition::new(
                    "BUSQUEDA",
                    vec!["buscar {nombre_producto}".to_string()],
                )
                .with_parameter("nombre_producto", SlotSpec::string().required()),
                IntentDefinition::new(
                    "COMPRA",
                    vec!["comprar {cantidad} {nombre_producto}".to_string()],
                )
                .with_parameter("nombre_producto", SlotSpec::string().required())
                .with_parameter(
                    "cantidad",
                    SlotSpec::number().required().with_default(1.0.into()),
                ),
                IntentDefinition::new("SALUDO", vec!["hola".to_string()]),
            ])
            .unwrap(),
        )
    }

    fn fixed(label: &'static str, confidence: f64) -> Arc<dyn SecondaryClassifier> {
        Arc::new(move |_: &str| -> Result<Classification, ClassifierError> {
            Ok(Classification::new(label, confidence))
        })
    }

    fn failing() -> Arc<dyn SecondaryClassifier> {
        Arc::new(|_: &str| -> Result<Classification, ClassifierError> {
            Err(ClassifierError::Failed("model not loaded".to_string()))
        })
    }

    #[test]
    fn test_pattern_detection_extracts_parameters() {
        let engine = IntentEngine::new(catalog(), DetectionConfig::default());
        let result = engine.detect_with("buscar laptop gaming", DetectionMethod::Pattern);

        assert_eq!(result.intent_id.as_deref(), Some("BUSQUEDA"));
        assert_eq!(result.pattern.as_deref(), Some("buscar {nombre_producto}"));
        assert_eq!(
            result.parameters.get("nombre_producto"),
            Some(&SlotValue::Text("laptop gaming".to_string()))
        );
    }

    #[test]
    fn test_invalid_value_falls_back_to_default() {
        let engine = IntentEngine::new(catalog(), DetectionConfig::default());
        let result = engine.detect_with("comprar varias sillas", DetectionMethod::Pattern);

        assert_eq!(result.intent_id.as_deref(), Some("COMPRA"));
        assert_eq!(result.parameters.get("cantidad"), Some(&SlotValue::Number(1.0)));
        assert_eq!(
            result.parameters.get("nombre_producto"),
            Some(&SlotValue::Text("sillas".to_string()))
        );
    }

    #[test]
    fn test_below_min_confidence_reports_no_intent() {
        let engine = IntentEngine::new(catalog(), DetectionConfig::default());
        let result = engine.detect_with("holamundo", DetectionMethod::Pattern);

        assert!(result.intent_id.is_none());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.pattern.as_deref(), Some("hola"));
        assert!(result.parameters.is_empty());
    }

    #[test]
    fn test_respect_intent_threshold_rejects() {
        let def = IntentDefinition::new("AYUDA", vec!["ayuda ur".to_string()]);
        let catalog = Arc::new(IntentCatalog::from_definitions(vec![def]).unwrap());

        let lenient = IntentEngine::new(Arc::clone(&catalog), DetectionConfig::default());
        let result = lenient.detect_with("ayuda urgente", DetectionMethod::Pattern);
        assert_eq!(result.intent_id.as_deref(), Some("AYUDA"));
        assert!((result.confidence - 0.5).abs() < f64::EPSILON);

        let config = DetectionConfig {
            respect_intent_thresholds: true,
            ..DetectionConfig::default()
        };
        let strict = IntentEngine::new(catalog, config);
        let result = strict.detect_with("ayuda urgente", DetectionMethod::Pattern);
        assert!(result.intent_id.is_none());
        assert!((result.confidence - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_candidate() {
        let engine = IntentEngine::new(catalog(), DetectionConfig::default());
        let result = engine.detect_with("xyz123", DetectionMethod::Pattern);
        assert!(result.intent_id.is_none());
        assert_eq!(result.confidence, 0.0);
        assert!(result.parameters.is_empty());
    }

    #[test]
    fn test_secondary_without_classifier_reports_error() {
        let engine = IntentEngine::new(catalog(), DetectionConfig::default());
        let result = engine.detect_with("hola", DetectionMethod::Secondary);
        assert!(result.intent_id.is_none());
        assert!(result.error.is_some());
    }

    #[test]
    fn test_secondary_label_normalised_and_parameters_extracted() {
        let engine = IntentEngine::new(catalog(), DetectionConfig::default())
            .with_classifier(fixed("busqueda", 0.8));
        let result = engine.detect_with("buscar mesa", DetectionMethod::Secondary);

        assert_eq!(result.intent_id.as_deref(), Some("BUSQUEDA"));
        assert_eq!(result.parameters["nombre_producto"], SlotValue::Text("mesa".to_string()));
    }

    #[test]
    fn test_secondary_unknown_label_or_low_confidence() {
        let engine = IntentEngine::new(catalog(), DetectionConfig::default())
            .with_classifier(fixed("RESERVA", 0.9));
        assert!(engine.detect_with("reservar mesa", DetectionMethod::Secondary).intent_id.is_none());

        let engine = IntentEngine::new(catalog(), DetectionConfig::default())
            .with_classifier(fixed("SALUDO", 0.2));
        let result = engine.detect_with("hola", DetectionMethod::Secondary);
        assert!(result.intent_id.is_none());
        assert!((result.confidence - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hybrid_prefers_confident_pattern() {
        let engine = IntentEngine::new(catalog(), DetectionConfig::default())
            .with_classifier(fixed("SALUDO", 0.99));
        let result = engine.detect_with("buscar mesa", DetectionMethod::Hybrid);

        assert_eq!(result.intent_id.as_deref(), Some("BUSQUEDA"));
        assert_eq!(result.decision, Some(HybridDecision::PatternHighConfidence));
        assert_eq!(result.secondary_confidence, Some(0.99));
        assert_eq!(result.method, DetectionMethod::Hybrid);
    }

    #[test]
    fn test_hybrid_uses_confident_secondary() {
        let engine = IntentEngine::new(catalog(), DetectionConfig::default())
            .with_classifier(fixed("SALUDO", 0.65));
        let result = engine.detect_with("buenas a todos", DetectionMethod::Hybrid);

        assert_eq!(result.intent_id.as_deref(), Some("SALUDO"));
        assert_eq!(result.decision, Some(HybridDecision::SecondaryHighConfidence));
        assert_eq!(result.pattern_confidence, Some(0.0));
    }

    #[test]
    fn test_hybrid_best_of_both_ties_go_to_secondary() {
        let engine = IntentEngine::new(catalog(), DetectionConfig::default())
            .with_classifier(fixed("SALUDO", 0.0));
        let result = engine.detect_with("nada que ver", DetectionMethod::Hybrid);

        assert_eq!(result.decision, Some(HybridDecision::BestOfBoth));
        assert!(result.intent_id.is_none());
    }

    #[test]
    fn test_hybrid_falls_back_when_classifier_fails() {
        let engine =
            IntentEngine::new(catalog(), DetectionConfig::default()).with_classifier(failing());
        let result = engine.detect("hola");

        assert_eq!(result.intent_id.as_deref(), Some("SALUDO"));
        assert_eq!(result.decision, Some(HybridDecision::PatternFallback));
        assert!(result.error.as_deref().unwrap_or_default().contains("model not loaded"));
    }

    #[test]
    fn test_keyword_fallback_fills_uncaptured_slot() {
        let catalog = Arc::new(
            IntentCatalog::from_definitions(vec![IntentDefinition::new(
                "VENTA",
                vec!["vender {nombre_producto}".to_string()],
            )
            .with_parameter("precio", SlotSpec::number())])
            .unwrap(),
        );
        let text = "quiero vender mi bici precio 120";

        let plain = IntentEngine::new(Arc::clone(&catalog), DetectionConfig::default());
        assert!(!plain.extract_parameters(text, "VENTA").contains_key("precio"));

        let config = DetectionConfig {
            keyword_fallback: true,
            ..DetectionConfig::default()
        };
        let engine = IntentEngine::new(catalog, config);
        let params = engine.extract_parameters(text, "VENTA");
        assert_eq!(params.get("precio"), Some(&SlotValue::Number(120.0)));
    }

    #[test]
    fn test_compare_methods_covers_all() {
        let engine = IntentEngine::new(catalog(), DetectionConfig::default())
            .with_classifier(fixed("SALUDO", 0.9));
        let comparisons = engine.compare_methods("hola");

        let methods: Vec<DetectionMethod> = comparisons.iter().map(|c| c.method).collect();
        assert_eq!(methods, DetectionMethod::ALL.to_vec());
        assert!(comparisons.iter().all(|c| c.result.intent_id.as_deref() == Some("SALUDO")));
    }

    #[test]
    fn test_result_serialises_camel_case() {
        let engine = IntentEngine::new(catalog(), DetectionConfig::default());
        let json =
            serde_json::to_value(engine.detect_with("buscar mesa", DetectionMethod::Pattern)).unwrap();

        assert_eq!(json["intentId"], "BUSQUEDA");
        assert_eq!(json["parameters"]["nombre_producto"], "mesa");
        assert_eq!(json["method"], "pattern");
        assert!(json.get("decision").is_none());
    }
}
