//! Cumulative-weight random selection.
//!
//! Used by the task selector, the mission selector, and construction site
//! choice. Candidates are an ordered `(key, weight)` list; the order is
//! part of the contract because ties resolve to the earlier entry.

use rand::Rng;

/// Pick one key with probability proportional to its weight.
///
/// Draws uniformly in `[0, total)` and returns the first entry whose running
/// sum exceeds the draw. Negative and non-finite weights count as zero.
/// Returns `None` when the total weight is zero.
pub fn select_weighted<K: Copy>(candidates: &[(K, f64)], rng: &mut impl Rng) -> Option<K> {
    let total = total_weight(candidates);
    if total <= 0.0 || !total.is_finite() {
        return None;
    }

    let draw = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    for (key, w) in candidates {
        let w = usable(*w);
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        if draw < cumulative {
            return Some(*key);
        }
    }
    // Rounding can leave the draw at the very top of the range.
    candidates
        .iter()
        .rev()
        .find(|(_, w)| usable(*w) > 0.0)
        .map(|(key, _)| *key)
}

/// Sum of the usable weights.
pub fn total_weight<K>(candidates: &[(K, f64)]) -> f64 {
    candidates
        .iter()
        .map(|(_, w)| usable(*w))
        .sum()
}

fn usable(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn only_positive_weight_wins() {
        let mut rng = SmallRng::seed_from_u64(3);
        let candidates = [('A', 0.0), ('B', 10.0), ('C', 0.0)];
        for _ in 0..1000 {
            assert_eq!(select_weighted(&candidates, &mut rng), Some('B'));
        }
    }

    #[test]
    fn equal_weights_split_evenly() {
        let mut rng = SmallRng::seed_from_u64(42);
        let candidates = [('A', 1.0), ('B', 1.0)];
        let trials = 10_000_u32;
        let mut a_count = 0_u32;
        for _ in 0..trials {
            if select_weighted(&candidates, &mut rng) == Some('A') {
                a_count = a_count.saturating_add(1);
            }
        }
        let share = f64::from(a_count) / f64::from(trials);
        assert!((share - 0.5).abs() <= 0.03, "share of A was {share}");
    }

    #[test]
    fn zero_total_selects_nothing() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(select_weighted::<char>(&[], &mut rng), None);
        assert_eq!(select_weighted(&[('A', 0.0), ('B', -4.0)], &mut rng), None);
        assert_eq!(select_weighted(&[('A', f64::NAN), ('B', 2.0)], &mut rng), Some('B'));
    }

    #[test]
    fn total_ignores_unusable_weights() {
        let total = total_weight(&[(1, 2.5), (2, -1.0), (3, f64::INFINITY), (4, 0.5)]);
        assert!((total - 3.0).abs() < f64::EPSILON);
    }
}
