//! Detection settings and catalog loading
//!
//! Settings default to the values below and may be overridden from JSON or
//! the environment (`DETECTION_METHOD`, `PATTERN_MIN_CONFIDENCE`,
//! `SECONDARY_MIN_CONFIDENCE`).

use crate::catalog::IntentCatalog;
use crate::error::ConfigError;
use crate::matcher::MIN_CONFIDENCE;
use crate::types::IntentDefinition;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Catalog shipped with the crate
pub const BUILTIN_CATALOG: &str = include_str!("../config/intents.json");

/// How an utterance is classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Literal-skeleton ranking followed by anchored extraction
    Pattern,
    /// The injected secondary classifier alone
    Secondary,
    /// Pattern and secondary results merged under thresholds
    #[default]
    Hybrid,
}

impl DetectionMethod {
    pub const ALL: [DetectionMethod; 3] = [
        DetectionMethod::Pattern,
        DetectionMethod::Secondary,
        DetectionMethod::Hybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::Pattern => "pattern",
            DetectionMethod::Secondary => "secondary",
            DetectionMethod::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectionMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pattern" | "pattern_matching" => Ok(DetectionMethod::Pattern),
            "secondary" | "bert" => Ok(DetectionMethod::Secondary),
            "hybrid" => Ok(DetectionMethod::Hybrid),
            other => Err(ConfigError::UnknownMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectionConfig {
    pub default_method: DetectionMethod,
    /// Minimum ranker score for the pattern method
    pub pattern_min_confidence: f64,
    /// Minimum classifier confidence for the secondary method
    pub secondary_min_confidence: f64,
    /// Hybrid: pattern confidence at which the pattern result wins outright
    pub hybrid_pattern_threshold: f64,
    /// Hybrid: secondary confidence at which the secondary result wins
    pub hybrid_secondary_threshold: f64,
    /// Recover uncaptured slots by keyword proximity
    pub keyword_fallback: bool,
    /// Also require each intent's own `confidenceThreshold`
    pub respect_intent_thresholds: bool,
    pub max_alternatives: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            default_method: DetectionMethod::Hybrid,
            pattern_min_confidence: MIN_CONFIDENCE,
            secondary_min_confidence: 0.4,
            hybrid_pattern_threshold: 0.7,
            hybrid_secondary_threshold: 0.6,
            keyword_fallback: false,
            respect_intent_thresholds: false,
            max_alternatives: 3,
        }
    }
}

impl DetectionConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Apply overrides from a key lookup (the environment in production)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(method) = lookup("DETECTION_METHOD") {
            self.default_method = method.parse()?;
        }
        if let Some(value) = lookup("PATTERN_MIN_CONFIDENCE") {
            self.pattern_min_confidence = parse_ratio("PATTERN_MIN_CONFIDENCE", &value)?;
        }
        if let Some(value) = lookup("SECONDARY_MIN_CONFIDENCE") {
            self.secondary_min_confidence = parse_ratio("SECONDARY_MIN_CONFIDENCE", &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratios = [
            ("patternMinConfidence", self.pattern_min_confidence),
            ("secondaryMinConfidence", self.secondary_min_confidence),
            ("hybridPatternThreshold", self.hybrid_pattern_threshold),
            ("hybridSecondaryThreshold", self.hybrid_secondary_threshold),
        ];
        for (field, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{} is outside [0, 1]", value),
                });
            }
        }
        Ok(())
    }
}

fn parse_ratio(field: &'static str, value: &str) -> Result<f64, ConfigError> {
    let ratio: f64 = value.trim().parse().map_err(|_| ConfigError::Invalid {
        field,
        reason: format!("'{}' is not a number", value),
    })?;
    if !(0.0..=1.0).contains(&ratio) {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("{} is outside [0, 1]", ratio),
        });
    }
    Ok(ratio)
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    intents: Vec<IntentDefinition>,
}

/// Parse `{"intents": [...]}`; array order becomes enumeration order
pub fn load_catalog_str(json: &str) -> Result<IntentCatalog, ConfigError> {
    let file: CatalogFile = serde_json::from_str(json)?;
    Ok(IntentCatalog::from_definitions(file.intents)?)
}

pub fn load_catalog_path(path: impl AsRef<Path>) -> Result<IntentCatalog, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    let catalog = load_catalog_str(&raw)?;
    info!(path = %path.display(), intents = catalog.len(), "loaded intent catalog");
    Ok(catalog)
}

pub fn builtin_catalog() -> Result<IntentCatalog, ConfigError> {
    load_catalog_str(BUILTIN_CATALOG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SlotValue;

    #[test]
    fn test_builtin_catalog_loads_in_order() {
        let catalog = builtin_catalog().unwrap();
        let ids: Vec<String> = catalog.list_intents().into_iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            vec!["BUSQUEDA", "COMPRA", "VENTA", "AYUDA", "SALUDO", "DESPEDIDA", "PRECIO", "INFORMACION"]
        );

        let compra = catalog.get_parameters("COMPRA");
        assert_eq!(compra["cantidad"].default, Some(SlotValue::Number(1.0)));
    }

    #[test]
    fn test_method_names() {
        assert_eq!("pattern_matching".parse::<DetectionMethod>().unwrap(), DetectionMethod::Pattern);
        assert_eq!("BERT".parse::<DetectionMethod>().unwrap(), DetectionMethod::Secondary);
        assert_eq!(DetectionMethod::Hybrid.to_string(), "hybrid");
        assert!("neural".parse::<DetectionMethod>().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = DetectionConfig::default()
            .with_overrides(|key| match key {
                "DETECTION_METHOD" => Some("pattern".to_string()),
                "PATTERN_MIN_CONFIDENCE" => Some("0.5".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.default_method, DetectionMethod::Pattern);
        assert!((config.pattern_min_confidence - 0.5).abs() < f64::EPSILON);
        assert!((config.secondary_min_confidence - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let result = DetectionConfig::default().with_overrides(|key| {
            (key == "SECONDARY_MIN_CONFIDENCE").then(|| "1.7".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            DetectionConfig::from_json_str(r#"{"defaultMethod": "secondary", "keywordFallback": true}"#)
                .unwrap();
        assert_eq!(config.default_method, DetectionMethod::Secondary);
        assert!(config.keyword_fallback);
        assert_eq!(config.max_alternatives, 3);
    }

    #[test]
    fn test_duplicate_ids_in_file() {
        let json = r#"{"intents": [
            {"id": "A", "patterns": ["hola"]},
            {"id": "A", "patterns": ["adiós"]}
        ]}"#;
        assert!(matches!(load_catalog_str(json), Err(ConfigError::Catalog(_))));
    }
}
