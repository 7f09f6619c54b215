//! Coarse token-set similarity between two normalized texts

use std::collections::HashSet;

/// Jaccard index of the whitespace-separated token sets of `a` and `b`
///
/// Word order and repetition are ignored. Returns 0.0 when either side is
/// empty and is always within `[0, 1]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();

    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }

    let intersection = left.intersection(&right).count();
    intersection as f64 / union as f64
}
