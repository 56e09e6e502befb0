//! Candidate ranking - fast filtering of catalog patterns against user input

use crate::catalog::CatalogSnapshot;
use crate::similarity::{normalize_input, skeleton_coincides, word_overlap};
use crate::types::MatchCandidate;

/// Minimum score for the pattern method to accept its best candidate
pub const MIN_CONFIDENCE: f64 = 0.30;

/// Every pattern whose literal skeleton occurs in the input, best first.
///
/// Ties keep catalog order: intents in enumeration order, then patterns in
/// declared order.
pub fn rank_candidates(input: &str, catalog: &CatalogSnapshot) -> Vec<MatchCandidate> {
    let input_normalized = normalize_input(input);

    let mut candidates: Vec<MatchCandidate> = Vec::new();
    for entry in catalog.entries() {
        for (pattern, skeleton) in entry.skeletons() {
            if skeleton_coincides(&input_normalized, skeleton) {
                candidates.push(MatchCandidate::new(
                    entry.id().to_string(),
                    pattern.to_string(),
                    word_overlap(&input_normalized, skeleton),
                ));
            }
        }
    }

    // Stable sort keeps enumeration order among equal scores
    candidates.sort_by(|a, b| {
        b.confidence_score
            .partial_cmp(&a.confidence_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    candidates
}

/// The top candidate if it reaches `min_confidence`
pub fn best_match(
    input: &str,
    catalog: &CatalogSnapshot,
    min_confidence: f64,
) -> Option<MatchCandidate> {
    rank_candidates(input, catalog)
        .into_iter()
        .next()
        .filter(|c| c.confidence_score >= min_confidence)
}

/// Best candidate per intent, excluding `skip_intent`, in ranked order
pub fn alternatives(
    candidates: &[MatchCandidate],
    skip_intent: Option<&str>,
    limit: usize,
) -> Vec<MatchCandidate> {
    let mut picked: Vec<MatchCandidate> = Vec::new();
    for candidate in candidates {
        if picked.len() >= limit {
            break;
        }
        let skipped = Some(candidate.intent_id.as_str()) == skip_intent;
        if skipped || picked.iter().any(|p| p.intent_id == candidate.intent_id) {
            continue;
        }
        picked.push(candidate.clone());
    }
    picked
}
