//! Turns a batch of candidates into the single point an action targets.

use super::types::{MatchCandidate, MatchPoint, PointRule, SortKey};

/// Points for `candidates`, ordered ascending by `sort` (ties broken by the
/// other axis).
pub fn ordered_points(
    candidates: &[MatchCandidate],
    rule: PointRule,
    sort: SortKey,
) -> Vec<MatchPoint> {
    let mut points: Vec<MatchPoint> = candidates.iter().map(|c| c.point(rule)).collect();
    match sort {
        SortKey::X => points.sort_by_key(|p| (p.x, p.y)),
        SortKey::Y => points.sort_by_key(|p| (p.y, p.x)),
    }
    points
}

/// The `index`-th point after ordering, or `None` when there are not that
/// many candidates.
pub fn select(
    candidates: &[MatchCandidate],
    rule: PointRule,
    sort: SortKey,
    index: usize,
) -> Option<MatchPoint> {
    ordered_points(candidates, rule, sort).get(index).copied()
}
