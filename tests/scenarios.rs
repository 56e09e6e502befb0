use intent_engine::config::builtin_catalog;
use intent_engine::{
    CatalogError, DetectionConfig, DetectionMethod, HybridDecision, IntentDefinition,
    IntentEngine, SlotValue,
};
use std::sync::Arc;

fn engine() -> IntentEngine {
    let catalog = builtin_catalog().expect("built-in catalog loads");
    IntentEngine::new(Arc::new(catalog), DetectionConfig::default())
}

#[test]
fn search_captures_multi_word_product() {
    let result = engine().detect_with("buscar laptop gaming", DetectionMethod::Pattern);

    assert_eq!(result.intent_id.as_deref(), Some("BUSQUEDA"));
    assert_eq!(result.parameters.len(), 1);
    assert_eq!(
        result.parameters["nombre_producto"],
        SlotValue::Text("laptop gaming".to_string())
    );
}

#[test]
fn greeting_has_full_confidence_and_no_parameters() {
    let result = engine().detect("hola");

    assert_eq!(result.intent_id.as_deref(), Some("SALUDO"));
    assert!((result.confidence - 1.0).abs() < f64::EPSILON);
    assert!(result.parameters.is_empty());
    // No classifier is configured, so hybrid detection relies on patterns
    assert_eq!(result.decision, Some(HybridDecision::PatternFallback));
}

#[test]
fn gibberish_matches_nothing() {
    let result = engine().detect_with("xyz123", DetectionMethod::Pattern);

    assert!(result.intent_id.is_none());
    assert!(result.pattern.is_none());
    assert!(result.parameters.is_empty());
}

#[test]
fn later_pattern_of_same_intent_extracts() {
    let result = engine().detect_with("Cuál es el precio de la mesa", DetectionMethod::Pattern);

    assert_eq!(result.intent_id.as_deref(), Some("PRECIO"));
    assert_eq!(
        result.parameters["nombre_producto"],
        SlotValue::Text("la mesa".to_string())
    );
}

#[test]
fn duplicate_add_leaves_catalog_untouched() {
    let engine = engine();
    let catalog = engine.catalog();
    let before = catalog.get_patterns("SALUDO");

    let err = catalog
        .add_intent(IntentDefinition::new("SALUDO", vec!["qué onda".to_string()]))
        .unwrap_err();

    assert!(matches!(err, CatalogError::DuplicateIntent(ref id) if id == "SALUDO"));
    assert_eq!(catalog.get_patterns("SALUDO"), before);
    assert_eq!(
        engine.detect_with("buenos días", DetectionMethod::Pattern).intent_id.as_deref(),
        Some("SALUDO")
    );
}

#[test]
fn added_intent_is_detected_and_removable() {
    let engine = engine();
    let definition = IntentDefinition::new("RESERVA", vec!["reservar mesa para {personas}".to_string()])
        .with_parameter("personas", intent_engine::SlotSpec::number().required());
    engine.catalog().add_intent(definition).unwrap();

    let result = engine.detect_with("reservar mesa para 4", DetectionMethod::Pattern);
    assert_eq!(result.intent_id.as_deref(), Some("RESERVA"));
    assert_eq!(result.parameters["personas"], SlotValue::Number(4.0));

    engine.catalog().remove_intent("RESERVA").unwrap();
    let result = engine.detect_with("reservar mesa para 4", DetectionMethod::Pattern);
    assert!(result.intent_id.is_none());
}
