//! Intent catalog
//!
//! Owns every `IntentDefinition` together with its compiled patterns. Readers
//! take an `Arc` snapshot and never observe a half-applied mutation; writers
//! build a new snapshot under the write lock and swap it in, recompiling only
//! the intent they touched.

use crate::error::CatalogError;
use crate::pattern::CompiledPattern;
use crate::similarity::literal_skeleton;
use crate::types::{
    CatalogStats, IntentDefinition, IntentPatch, IntentSummary, SlotKind, SlotSpec, SlotValue,
};
use crate::validation::parse_date;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A definition plus everything derived from it
#[derive(Debug)]
pub struct IntentEntry {
    definition: IntentDefinition,
    compiled: Vec<(usize, CompiledPattern)>,
    skeletons: Vec<String>,
}

impl IntentEntry {
    fn build(definition: IntentDefinition) -> Self {
        let mut compiled = Vec::with_capacity(definition.patterns.len());
        for (idx, template) in definition.patterns.iter().enumerate() {
            match CompiledPattern::compile(template) {
                Ok(pattern) => compiled.push((idx, pattern)),
                Err(e) => warn!(intent = %definition.id, error = %e, "skipping pattern"),
            }
        }
        let skeletons = definition.patterns.iter().map(|p| literal_skeleton(p)).collect();

        debug!(
            intent = %definition.id,
            compiled = compiled.len(),
            total = definition.patterns.len(),
            "compiled intent patterns"
        );

        Self {
            definition,
            compiled,
            skeletons,
        }
    }

    pub fn definition(&self) -> &IntentDefinition {
        &self.definition
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    /// Successfully compiled patterns with their index in the definition
    pub fn compiled_patterns(&self) -> impl Iterator<Item = (usize, &CompiledPattern)> {
        self.compiled.iter().map(|(idx, p)| (*idx, p))
    }

    /// `(template, literal skeleton)` for every declared pattern
    pub fn skeletons(&self) -> impl Iterator<Item = (&str, &str)> {
        self.definition
            .patterns
            .iter()
            .map(String::as_str)
            .zip(self.skeletons.iter().map(String::as_str))
    }
}

/// Immutable view of the catalog at one point in time
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    entries: Vec<Arc<IntentEntry>>,
    index: AHashMap<String, usize>,
}

impl CatalogSnapshot {
    /// Entries in enumeration (insertion) order
    pub fn entries(&self) -> impl Iterator<Item = &IntentEntry> {
        self.entries.iter().map(|e| e.as_ref())
    }

    pub fn entry(&self, id: &str) -> Option<&IntentEntry> {
        self.index.get(id).map(|&idx| self.entries[idx].as_ref())
    }

    pub fn get(&self, id: &str) -> Option<&IntentDefinition> {
        self.entry(id).map(IntentEntry::definition)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn list(&self) -> Vec<IntentSummary> {
        self.entries().map(|e| e.definition.summary()).collect()
    }

    pub fn patterns(&self, id: &str) -> Vec<String> {
        self.get(id).map(|d| d.patterns.clone()).unwrap_or_default()
    }

    pub fn parameters(&self, id: &str) -> BTreeMap<String, SlotSpec> {
        self.get(id).map(|d| d.parameters.clone()).unwrap_or_default()
    }

    pub fn synonyms(&self, id: &str) -> BTreeMap<String, Vec<String>> {
        self.get(id).map(|d| d.synonyms.clone()).unwrap_or_default()
    }

    /// Alternatives for `word` in the intent's synonym table, or `[word]`
    pub fn find_synonyms(&self, word: &str, id: &str) -> Vec<String> {
        self.get(id)
            .and_then(|d| d.synonyms.get(&word.to_lowercase()))
            .cloned()
            .unwrap_or_else(|| vec![word.to_string()])
    }

    /// Upper-cased, trimmed id if it names an intent
    pub fn normalize_intent(&self, id: &str) -> Option<String> {
        let normalized = id.trim().to_uppercase();
        self.contains(&normalized).then_some(normalized)
    }

    pub fn stats(&self) -> CatalogStats {
        let total = self.entries.len();
        let mut with_patterns = 0;
        let mut with_parameters = 0;
        let mut total_patterns = 0;
        let mut total_parameters = 0;

        for entry in self.entries() {
            let def = entry.definition();
            if !def.patterns.is_empty() {
                with_patterns += 1;
                total_patterns += def.patterns.len();
            }
            if !def.parameters.is_empty() {
                with_parameters += 1;
                total_parameters += def.parameters.len();
            }
        }

        let average = |n: usize| if total > 0 { n as f64 / total as f64 } else { 0.0 };
        CatalogStats {
            total,
            with_patterns,
            with_parameters,
            average_patterns: average(total_patterns),
            average_parameters: average(total_parameters),
        }
    }

    fn push(&mut self, entry: IntentEntry) {
        self.index.insert(entry.id().to_string(), self.entries.len());
        self.entries.push(Arc::new(entry));
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, e)| (e.id().to_string(), idx))
            .collect();
    }
}

/// Shared, mutable registry of intents
#[derive(Debug, Default)]
pub struct IntentCatalog {
    state: RwLock<Arc<CatalogSnapshot>>,
}

impl IntentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog, validating every definition up front
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = IntentDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut snapshot = CatalogSnapshot::default();
        for definition in definitions {
            let definition = validate_definition(definition)?;
            if snapshot.contains(&definition.id) {
                return Err(CatalogError::DuplicateIntent(definition.id));
            }
            snapshot.push(IntentEntry::build(definition));
        }

        info!(intents = snapshot.len(), "intent catalog loaded");
        Ok(Self {
            state: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Consistent view for a sequence of reads
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.state.read())
    }

    pub fn list_intents(&self) -> Vec<IntentSummary> {
        self.snapshot().list()
    }

    pub fn get_intent(&self, id: &str) -> Option<IntentDefinition> {
        self.snapshot().get(id).cloned()
    }

    pub fn get_patterns(&self, id: &str) -> Vec<String> {
        self.snapshot().patterns(id)
    }

    pub fn get_parameters(&self, id: &str) -> BTreeMap<String, SlotSpec> {
        self.snapshot().parameters(id)
    }

    pub fn get_synonyms(&self, id: &str) -> BTreeMap<String, Vec<String>> {
        self.snapshot().synonyms(id)
    }

    pub fn is_valid_intent(&self, id: &str) -> bool {
        self.snapshot().contains(id)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn add_intent(&self, definition: IntentDefinition) -> Result<IntentDefinition, CatalogError> {
        let definition = validate_definition(definition)?;
        let mut state = self.state.write();
        if state.contains(&definition.id) {
            return Err(CatalogError::DuplicateIntent(definition.id));
        }

        let entry = IntentEntry::build(definition.clone());
        let mut next = CatalogSnapshot::clone(&state);
        next.push(entry);
        *state = Arc::new(next);

        info!(intent = %definition.id, "intent added");
        Ok(definition)
    }

    /// Replace an existing definition; the stored id is always `id`
    pub fn update_intent(
        &self,
        id: &str,
        definition: IntentDefinition,
    ) -> Result<IntentDefinition, CatalogError> {
        let updated = self.rebuild_entry(id, |_| definition)?;
        info!(intent = %updated.id, "intent updated");
        Ok(updated)
    }

    /// Merge the present fields of `patch` into an existing definition
    pub fn patch_intent(&self, id: &str, patch: IntentPatch) -> Result<IntentDefinition, CatalogError> {
        let patched = self.rebuild_entry(id, |existing| patch.apply_to(existing))?;
        info!(intent = %patched.id, "intent patched");
        Ok(patched)
    }

    pub fn remove_intent(&self, id: &str) -> Result<IntentDefinition, CatalogError> {
        let id = id.trim();
        let mut state = self.state.write();
        let idx = *state
            .index
            .get(id)
            .ok_or_else(|| CatalogError::UnknownIntent(id.to_string()))?;

        let mut next = CatalogSnapshot::clone(&state);
        let removed = next.entries.remove(idx);
        next.reindex();
        *state = Arc::new(next);

        info!(intent = %id, "intent removed");
        Ok(removed.definition.clone())
    }

    /// Swap in a rebuilt entry for `id`, leaving every other entry shared
    fn rebuild_entry<F>(&self, id: &str, build: F) -> Result<IntentDefinition, CatalogError>
    where
        F: FnOnce(&IntentDefinition) -> IntentDefinition,
    {
        let id = id.trim();
        let mut state = self.state.write();
        let idx = *state
            .index
            .get(id)
            .ok_or_else(|| CatalogError::UnknownIntent(id.to_string()))?;

        let mut definition = build(state.entries[idx].definition());
        definition.id = id.to_string();
        let definition = validate_definition(definition)?;

        let entry = IntentEntry::build(definition.clone());
        let mut next = CatalogSnapshot::clone(&state);
        next.entries[idx] = Arc::new(entry);
        *state = Arc::new(next);
        Ok(definition)
    }
}

/// Check a definition before it enters the catalog, filling the display name
pub fn validate_definition(mut definition: IntentDefinition) -> Result<IntentDefinition, CatalogError> {
    let id = definition.id.trim().to_string();
    let invalid = |reason: String| CatalogError::InvalidDefinition {
        id: id.clone(),
        reason,
    };

    if id.is_empty() {
        return Err(invalid("id must not be empty".to_string()));
    }
    if definition.patterns.is_empty() {
        return Err(invalid("at least one pattern is required".to_string()));
    }
    if !(0.0..=1.0).contains(&definition.confidence_threshold) {
        return Err(invalid(format!(
            "confidence threshold {} is outside [0, 1]",
            definition.confidence_threshold
        )));
    }
    if definition.priority < 1 {
        return Err(invalid("priority must be at least 1".to_string()));
    }
    for (slot, spec) in &definition.parameters {
        validate_slot(spec).map_err(|reason| invalid(format!("slot '{}': {}", slot, reason)))?;
    }

    if definition.name.trim().is_empty() {
        definition.name = id.clone();
    }
    definition.id = id;
    Ok(definition)
}

fn validate_slot(spec: &SlotSpec) -> Result<(), String> {
    match &spec.kind {
        SlotKind::String {
            min_length: Some(min),
            max_length: Some(max),
            ..
        } if min > max => return Err(format!("minLength {} exceeds maxLength {}", min, max)),
        SlotKind::Number {
            min: Some(min),
            max: Some(max),
        } if min > max => return Err(format!("min {} exceeds max {}", min, max)),
        SlotKind::Date { min_date, max_date } => {
            for bound in [min_date, max_date].into_iter().flatten() {
                if parse_date(bound).is_none() {
                    return Err(format!("unparseable date bound '{}'", bound));
                }
            }
        }
        _ => {}
    }

    let compatible = match (&spec.kind, &spec.default) {
        (_, None) => true,
        (SlotKind::String { .. }, Some(SlotValue::Text(_))) => true,
        (SlotKind::Number { .. }, Some(SlotValue::Number(_))) => true,
        (SlotKind::Boolean, Some(SlotValue::Boolean(_))) => true,
        (SlotKind::Date { .. }, Some(SlotValue::Text(d))) => parse_date(d).is_some(),
        _ => false,
    };
    if !compatible {
        return Err(format!("default does not match type {}", spec.kind.type_name()));
    }

    Ok(())
}
