//! Literal-skeleton coincidence and word-overlap scoring
//!
//! Cheap proxies for the anchored matcher, used to surface and rank candidate
//! patterns before extraction.

use ahash::AHashSet;
use regex::Regex;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{.*?\}").expect("Invalid regex: placeholder marker"));

/// Lower-cased pattern text with every `{slot}` marker removed.
///
/// Whitespace runs collapse to one space but are otherwise kept, so
/// `buscar {x}` becomes `"buscar "`.
pub fn literal_skeleton(pattern: &str) -> String {
    collapse_whitespace(&PLACEHOLDER.replace_all(&pattern.to_lowercase(), ""))
}

/// Trimmed, lower-cased input with single spaces between words
pub fn normalize_input(input: &str) -> String {
    collapse_whitespace(input.trim()).to_lowercase()
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_whitespace = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                out.push(' ');
            }
            in_whitespace = true;
        } else {
            out.push(ch);
            in_whitespace = false;
        }
    }
    out
}

/// Whether the normalized input contains the pattern's literal skeleton
pub fn skeleton_coincides(input_normalized: &str, skeleton: &str) -> bool {
    input_normalized.contains(skeleton)
}

/// Fraction of skeleton words present as whole tokens in the input (0.0-1.0).
///
/// A skeleton with no words scores 0.
pub fn word_overlap(input_normalized: &str, skeleton: &str) -> f64 {
    let skeleton_words: Vec<&str> = skeleton.split_whitespace().collect();
    if skeleton_words.is_empty() {
        return 0.0;
    }

    let input_tokens: AHashSet<&str> = input_normalized.split_whitespace().collect();
    let matched = skeleton_words
        .iter()
        .filter(|word| input_tokens.contains(*word))
        .count();

    matched as f64 / skeleton_words.len() as f64
}
