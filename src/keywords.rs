//! Keyword-anchored slot recovery
//!
//! Fallback for slots the anchored patterns did not capture: find a keyword
//! associated with the slot and take the first word that follows it.

use crate::pattern::SlotCaptures;
use crate::types::SlotSpec;
use ahash::AHashMap;
use std::collections::BTreeMap;

/// Recover slot values from text by keyword proximity
pub struct KeywordExtractor {
    keywords: AHashMap<String, Vec<String>>,
}

impl KeywordExtractor {
    pub fn new() -> Self {
        let builtin: [(&str, &[&str]); 6] = [
            ("nombre_producto", &["producto", "artículo", "item", "cosa", "objeto"]),
            ("precio", &["precio", "costo", "valor", "tarifa", "cuánto cuesta"]),
            ("cantidad", &["cantidad", "número", "cuántos", "cuántas"]),
            ("tema", &["tema", "asunto", "materia", "sobre", "acerca de"]),
            ("fecha", &["fecha", "día", "cuándo"]),
            ("ubicacion", &["ubicación", "lugar", "dónde", "dirección"]),
        ];

        let keywords = builtin
            .iter()
            .map(|(slot, words)| {
                (
                    slot.to_string(),
                    words.iter().map(|w| w.to_string()).collect(),
                )
            })
            .collect();

        Self { keywords }
    }

    /// Replace or add the keyword list for a slot
    pub fn with_keywords(mut self, slot: impl Into<String>, keywords: Vec<String>) -> Self {
        self.keywords.insert(slot.into(), keywords);
        self
    }

    /// Keywords for a slot; the slot name itself when none are registered
    pub fn keywords_for(&self, slot: &str) -> Vec<String> {
        self.keywords
            .get(slot)
            .cloned()
            .unwrap_or_else(|| vec![slot.to_string()])
    }

    /// First word after the first keyword found in `text`
    pub fn extract(&self, text: &str, slot: &str) -> Option<String> {
        let text_lower = text.to_lowercase();

        for keyword in self.keywords_for(slot) {
            let keyword_lower = keyword.to_lowercase();
            if let Some(start) = text_lower.find(&keyword_lower) {
                // Lower-casing can change byte lengths, so slice the lowered text
                let after = &text_lower[start + keyword_lower.len()..];
                let original_after = original_tail(text, after);
                if let Some(word) = original_after.split_whitespace().next() {
                    return Some(word.to_string());
                }
            }
        }

        None
    }

    /// Fill declared slots missing from `captures` using keyword proximity
    pub fn fill_missing(
        &self,
        text: &str,
        schema: &BTreeMap<String, SlotSpec>,
        captures: &mut SlotCaptures,
    ) {
        for slot in schema.keys() {
            if captures.contains_key(slot) {
                continue;
            }
            if let Some(value) = self.extract(text, slot) {
                captures.insert(slot.clone(), value);
            }
        }
    }
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a suffix of the lower-cased text back onto the original casing.
///
/// Falls back to the lower-cased suffix when lower-casing changed the length.
fn original_tail<'a>(text: &'a str, lowered_tail: &'a str) -> &'a str {
    if text.len() == text.to_lowercase().len() {
        let start = text.len() - lowered_tail.len();
        if text.is_char_boundary(start) {
            return &text[start..];
        }
    }
    lowered_tail
}
