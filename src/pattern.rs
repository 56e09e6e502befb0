//! Pattern compiler and slot extractor
//!
//! A template such as `precio de {producto} (USD)` is split into literal and
//! placeholder segments and compiled into one anchored, case-insensitive
//! regex. Literal whitespace runs match one-or-more whitespace. A placeholder
//! in the last position captures greedily to the end of the input; every other
//! placeholder captures non-greedily up to the earliest point where the next
//! literal matches.

use crate::error::PatternCompilationError;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use tracing::warn;

/// Raw captured strings keyed by slot name, before coercion
pub type SlotCaptures = BTreeMap<String, String>;

/// A piece of a parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Slot(String),
}

/// Split a template into ordered literal and placeholder segments.
///
/// Leading and trailing whitespace of the template is ignored since inputs
/// are matched trimmed.
pub fn parse_template(template: &str) -> Result<Vec<Segment>, PatternCompilationError> {
    let trimmed = template.trim();
    let offset = template.len() - template.trim_start().len();

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut slot: Option<(usize, String)> = None;

    for (idx, ch) in trimmed.char_indices() {
        let position = idx + offset;
        match (ch, slot.take()) {
            ('{', None) => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                slot = Some((position, String::new()));
            }
            ('{', Some(_)) => {
                return Err(PatternCompilationError::NestedPlaceholder {
                    template: template.to_string(),
                    position,
                });
            }
            ('}', None) => {
                return Err(PatternCompilationError::UnmatchedClose {
                    template: template.to_string(),
                    position,
                });
            }
            ('}', Some((start, name))) => {
                segments.push(Segment::Slot(validate_slot_name(template, start, name)?));
            }
            (_, Some((start, mut name))) => {
                name.push(ch);
                slot = Some((start, name));
            }
            (_, None) => literal.push(ch),
        }
    }

    if let Some((position, _)) = slot {
        return Err(PatternCompilationError::UnclosedPlaceholder {
            template: template.to_string(),
            position,
        });
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}

fn validate_slot_name(
    template: &str,
    position: usize,
    name: String,
) -> Result<String, PatternCompilationError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(PatternCompilationError::EmptyPlaceholder {
            template: template.to_string(),
            position,
        });
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(PatternCompilationError::InvalidSlotName {
            template: template.to_string(),
            name,
        });
    }
    Ok(name)
}

/// Escape a literal segment, turning each whitespace run into `\s+`
fn literal_to_regex(literal: &str, out: &mut String) {
    let mut in_whitespace = false;
    let mut buf = [0u8; 4];
    for ch in literal.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                out.push_str(r"\s+");
                in_whitespace = true;
            }
        } else {
            in_whitespace = false;
            out.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
        }
    }
}

/// The compiled form of one template
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    matcher: Regex,
    slot_names: Vec<String>,
    adjacent_slots: bool,
}

impl CompiledPattern {
    pub fn compile(template: &str) -> Result<Self, PatternCompilationError> {
        let segments = parse_template(template)?;

        let mut expr = String::from("^");
        let mut slot_names = Vec::new();
        let mut adjacent_slots = false;
        let last = segments.len().saturating_sub(1);

        for (idx, segment) in segments.iter().enumerate() {
            match segment {
                Segment::Literal(text) => literal_to_regex(text, &mut expr),
                Segment::Slot(name) => {
                    if idx > 0 && matches!(segments[idx - 1], Segment::Slot(_)) {
                        adjacent_slots = true;
                    }
                    expr.push_str(if idx == last { "(.+)" } else { "(.+?)" });
                    slot_names.push(name.clone());
                }
            }
        }
        expr.push('$');

        if adjacent_slots {
            warn!(
                pattern = template,
                "pattern has adjacent placeholders; the earlier slot captures the shortest prefix"
            );
        }

        let matcher = RegexBuilder::new(&expr)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| PatternCompilationError::Regex {
                template: template.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            source: template.to_string(),
            matcher,
            slot_names,
            adjacent_slots,
        })
    }

    /// The template this pattern was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Slot names in capture order. Duplicates are kept positionally.
    pub fn slot_names(&self) -> &[String] {
        &self.slot_names
    }

    pub fn has_slots(&self) -> bool {
        !self.slot_names.is_empty()
    }

    /// True when two placeholders follow each other with no literal between
    pub fn has_adjacent_slots(&self) -> bool {
        self.adjacent_slots
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.matcher.is_match(text.trim())
    }

    /// Capture slot values from `text`.
    ///
    /// Returns `None` when the pattern does not accept the input. Values keep
    /// the input's original casing. A slot name occurring twice keeps the
    /// later capture.
    pub fn captures(&self, text: &str) -> Option<SlotCaptures> {
        let caps = self.matcher.captures(text.trim())?;
        let mut slots = SlotCaptures::new();
        for (idx, name) in self.slot_names.iter().enumerate() {
            if let Some(m) = caps.get(idx + 1) {
                let value = m.as_str().trim();
                if !value.is_empty() {
                    slots.insert(name.clone(), value.to_string());
                }
            }
        }
        Some(slots)
    }
}

/// Successful slot extraction: which pattern matched and what it captured
#[derive(Debug, Clone, PartialEq)]
pub struct SlotMatch {
    pub pattern_index: usize,
    pub pattern: String,
    pub slots: SlotCaptures,
}

/// Try each pattern in declared order and return the first that accepts the input
pub fn extract_slots<'a, I>(text: &str, patterns: I) -> Option<SlotMatch>
where
    I: IntoIterator<Item = (usize, &'a CompiledPattern)>,
{
    patterns.into_iter().find_map(|(pattern_index, pattern)| {
        pattern.captures(text).map(|slots| SlotMatch {
            pattern_index,
            pattern: pattern.source().to_string(),
            slots,
        })
    })
}
