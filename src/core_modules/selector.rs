//! Arg-max selection over scored candidates.
//!
//! An empty list is "no detection", not an error. Ties go to the candidate the
//! blob source produced first.

use crate::core_modules::scorer::ScoredCandidate;

/// Picks the highest-scoring candidate, keeping the earliest one on ties.
pub fn select_best(candidates: Vec<ScoredCandidate>) -> Option<ScoredCandidate> {
    let mut best: Option<ScoredCandidate> = None;
    for candidate in candidates {
        // Strictly greater, so an equal later score never displaces an earlier one.
        if best.as_ref().is_none_or(|current| candidate.score > current.score) {
            best = Some(candidate);
        }
    }
    best
}
