//! Non-max suppression: one representative box per cluster of overlapping
//! matches (a template correlates well at several neighbouring pixels).

use super::types::MatchCandidate;
use std::cmp::Ordering;

/// Fraction of a box's own area that may be covered by a better box before
/// it is dropped.
pub const DEFAULT_OVERLAP_THRESHOLD: f32 = 0.3;

/// Ranking used for suppression: best score first, then top-to-bottom,
/// then left-to-right. A total order, so repeated runs agree.
fn rank(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then(a.y0.cmp(&b.y0))
        .then(a.x0.cmp(&b.x0))
}

/// Greedy suppression. A candidate survives when no higher-ranked survivor
/// covers more than `overlap_threshold` of its area. Survivors are returned
/// in rank order.
pub fn non_max_suppression(
    mut candidates: Vec<MatchCandidate>,
    overlap_threshold: f32,
) -> Vec<MatchCandidate> {
    candidates.sort_by(rank);
    let mut kept: Vec<MatchCandidate> = Vec::with_capacity(candidates.len().min(16));
    for candidate in candidates {
        let area = candidate.area();
        let suppressed = area == 0
            || kept.iter().any(|k| {
                k.intersection(&candidate) as f64 / area as f64 > overlap_threshold as f64
            });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
