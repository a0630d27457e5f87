//! Cross-sensor timestamp matching.

use contracts::Timestamp;

/// Latest timestamp of `a` that has a partner in `b` strictly within
/// `tolerance_secs`, or [`Timestamp::ZERO`] when no pair qualifies.
///
/// Every `(ta, tb)` combination is checked. Among qualifying pairs the most
/// recent `ta` wins, not the pair with the smallest offset.
pub fn latest_matching_timestamp(
    a: &[Timestamp],
    b: &[Timestamp],
    tolerance_secs: f64,
) -> Timestamp {
    let mut best = Timestamp::ZERO;
    for &ta in a {
        for &tb in b {
            if ta.abs_diff_seconds(tb) < tolerance_secs && ta.seconds_since(best) > 0.0 {
                best = ta;
            }
        }
    }
    best
}
