use crate::types::price::PricePoint;

/// Prices of one A point and the B point it was matched with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlignedPair {
    pub value_a: f64,
    pub value_b: f64,
}

impl AlignedPair {
    pub fn new(value_a: f64, value_b: f64) -> Self {
        AlignedPair { value_a, value_b }
    }
}

impl From<(f64, f64)> for AlignedPair {
    fn from((value_a, value_b): (f64, f64)) -> Self {
        AlignedPair { value_a, value_b }
    }
}

/// Pairs every point of `a` with the nearest-in-time unused point of `b`.
///
/// Greedy and order-dependent: points of `a` are visited in their original
/// order and each claims the closest B point still available. Among equally
/// distant candidates the lowest B index wins. Once `b` is exhausted the
/// remaining A points produce no pair, so the result never exceeds
/// `min(a.len(), b.len())`.
pub fn align(a: &[PricePoint], b: &[PricePoint]) -> Vec<AlignedPair> {
    let b_times: Vec<i64> = b.iter().map(|p| p.timestamp_ms()).collect();
    let mut used = vec![false; b.len()];
    let mut aligned = Vec::with_capacity(a.len().min(b.len()));

    for point in a {
        let t_a = point.timestamp_ms();
        let mut best: Option<(usize, u64)> = None;

        for (idx, &t_b) in b_times.iter().enumerate() {
            if used[idx] {
                continue;
            }
            let diff = t_a.abs_diff(t_b);
            // Strict comparison: ties keep the earlier index
            if best.is_none_or(|(_, min_diff)| diff < min_diff) {
                best = Some((idx, diff));
            }
        }

        if let Some((idx, _)) = best {
            used[idx] = true;
            aligned.push(AlignedPair::new(point.price, b[idx].price));
        }
    }

    aligned
}
