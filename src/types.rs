//! Core data types for intent definitions, slots and match results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Typed values produced by slot coercion, keyed by slot name
pub type ExtractedParameters = BTreeMap<String, SlotValue>;

fn default_confidence_threshold() -> f64 {
    0.8
}

fn default_priority() -> u32 {
    1
}

/// One intent: its phrasings, slot schema and synonym table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub patterns: Vec<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, SlotSpec>,
    #[serde(default)]
    pub synonyms: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_priority")]
    pub priority: u32,
}

impl IntentDefinition {
    pub fn new(id: impl Into<String>, patterns: Vec<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: None,
            patterns,
            parameters: BTreeMap::new(),
            synonyms: BTreeMap::new(),
            confidence_threshold: default_confidence_threshold(),
            priority: default_priority(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_parameter(mut self, slot: impl Into<String>, spec: SlotSpec) -> Self {
        self.parameters.insert(slot.into(), spec);
        self
    }

    pub fn with_synonyms(mut self, word: impl Into<String>, alternatives: Vec<String>) -> Self {
        self.synonyms.insert(word.into(), alternatives);
        self
    }

    /// Export shape consumed by the HTTP/RPC layers
    pub fn summary(&self) -> IntentSummary {
        IntentSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            patterns: self.patterns.clone(),
            parameters: self
                .parameters
                .iter()
                .map(|(slot, spec)| {
                    (
                        slot.clone(),
                        ParameterSummary {
                            slot_type: spec.kind.type_name().to_string(),
                            required: spec.required,
                            description: spec.description.clone().unwrap_or_default(),
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Partial replacement for a stored definition.
///
/// Only the fields that are present replace the stored ones; the id is never
/// changed by a patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IntentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, SlotSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synonyms: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

impl IntentPatch {
    pub fn patterns(patterns: Vec<String>) -> Self {
        Self {
            patterns: Some(patterns),
            ..Self::default()
        }
    }

    /// `base` with every present field overwritten
    pub fn apply_to(self, base: &IntentDefinition) -> IntentDefinition {
        let mut merged = base.clone();
        if let Some(name) = self.name {
            merged.name = name;
        }
        if let Some(description) = self.description {
            merged.description = Some(description);
        }
        if let Some(patterns) = self.patterns {
            merged.patterns = patterns;
        }
        if let Some(parameters) = self.parameters {
            merged.parameters = parameters;
        }
        if let Some(synonyms) = self.synonyms {
            merged.synonyms = synonyms;
        }
        if let Some(threshold) = self.confidence_threshold {
            merged.confidence_threshold = threshold;
        }
        if let Some(priority) = self.priority {
            merged.priority = priority;
        }
        merged
    }
}

/// Declaration of a single slot: its type and constraints plus the shared flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSpec {
    #[serde(flatten)]
    pub kind: SlotKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<SlotValue>,
}

impl SlotSpec {
    pub fn new(kind: SlotKind) -> Self {
        Self {
            kind,
            required: false,
            description: None,
            default: None,
        }
    }

    pub fn string() -> Self {
        Self::new(SlotKind::String {
            min_length: None,
            max_length: None,
            transform: None,
        })
    }

    pub fn number() -> Self {
        Self::new(SlotKind::Number {
            min: None,
            max: None,
        })
    }

    pub fn boolean() -> Self {
        Self::new(SlotKind::Boolean)
    }

    pub fn date() -> Self {
        Self::new(SlotKind::Date {
            min_date: None,
            max_date: None,
        })
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: SlotValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Closed set of slot types, each carrying its own constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SlotKind {
    String {
        #[serde(default, rename = "minLength", skip_serializing_if = "Option::is_none")]
        min_length: Option<usize>,
        #[serde(default, rename = "maxLength", skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transform: Option<Transform>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    Boolean,
    Date {
        #[serde(default, rename = "minDate", skip_serializing_if = "Option::is_none")]
        min_date: Option<String>,
        #[serde(default, rename = "maxDate", skip_serializing_if = "Option::is_none")]
        max_date: Option<String>,
    },
}

impl SlotKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            SlotKind::String { .. } => "string",
            SlotKind::Number { .. } => "number",
            SlotKind::Boolean => "boolean",
            SlotKind::Date { .. } => "date",
        }
    }
}

/// Case transform applied to string slots before length checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    Lowercase,
    Uppercase,
    Capitalize,
}

/// A coerced slot value.
///
/// Dates are carried as their normalised ISO-8601 text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl SlotValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SlotValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SlotValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SlotValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotValue::Boolean(b) => write!(f, "{}", b),
            SlotValue::Number(n) => write!(f, "{}", n),
            SlotValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for SlotValue {
    fn from(value: &str) -> Self {
        SlotValue::Text(value.to_string())
    }
}

impl From<String> for SlotValue {
    fn from(value: String) -> Self {
        SlotValue::Text(value)
    }
}

impl From<f64> for SlotValue {
    fn from(value: f64) -> Self {
        SlotValue::Number(value)
    }
}

impl From<bool> for SlotValue {
    fn from(value: bool) -> Self {
        SlotValue::Boolean(value)
    }
}

/// A pattern that plausibly applies to the input, with its overlap score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub intent_id: String,
    pub pattern: String,
    pub confidence_score: f64,
}

impl MatchCandidate {
    pub fn new(intent_id: String, pattern: String, confidence_score: f64) -> Self {
        Self {
            intent_id,
            pattern,
            confidence_score,
        }
    }
}

/// Per-intent export shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub patterns: Vec<String>,
    pub parameters: BTreeMap<String, ParameterSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSummary {
    #[serde(rename = "type")]
    pub slot_type: String,
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

/// Aggregate counts over the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total: usize,
    pub with_patterns: usize,
    pub with_parameters: usize,
    pub average_patterns: f64,
    pub average_parameters: f64,
}
