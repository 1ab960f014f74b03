use crate::stats::alignment::{align, AlignedPair};
use crate::types::price::PricePoint;

/// Outcome of a correlation computation.
///
/// `Undefined` is a sentinel, not a measured absence of correlation. Its
/// numeric rendering through [`Correlation::value`] is `0.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Correlation {
    Coefficient(f64),
    Undefined(UndefinedReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UndefinedReason {
    /// Fewer than two aligned pairs.
    InsufficientPairs(usize),
    /// One side is constant across all aligned pairs.
    ZeroVariance,
}

impl Correlation {
    pub fn value(&self) -> f64 {
        match self {
            Correlation::Coefficient(r) => *r,
            Correlation::Undefined(_) => 0.0,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Correlation::Coefficient(_))
    }
}

/// Sample Pearson correlation over aligned pairs, with n - 1 normalization.
pub fn correlate(aligned: &[AlignedPair]) -> Correlation {
    let n = aligned.len();
    if n < 2 {
        return Correlation::Undefined(UndefinedReason::InsufficientPairs(n));
    }

    let mean_a = aligned.iter().map(|p| p.value_a).sum::<f64>() / n as f64;
    let mean_b = aligned.iter().map(|p| p.value_b).sum::<f64>() / n as f64;

    let mut covariance = 0.0;
    let mut variance_a = 0.0;
    let mut variance_b = 0.0;

    for pair in aligned {
        let diff_a = pair.value_a - mean_a;
        let diff_b = pair.value_b - mean_b;
        covariance += diff_a * diff_b;
        variance_a += diff_a * diff_a;
        variance_b += diff_b * diff_b;
    }

    let dof = (n - 1) as f64;
    covariance /= dof;
    variance_a /= dof;
    variance_b /= dof;

    let std_dev_a = variance_a.sqrt();
    let std_dev_b = variance_b.sqrt();

    if std_dev_a == 0.0 || std_dev_b == 0.0 {
        return Correlation::Undefined(UndefinedReason::ZeroVariance);
    }

    // Rounding can push |r| a hair past 1
    Correlation::Coefficient((covariance / (std_dev_a * std_dev_b)).clamp(-1.0, 1.0))
}

/// Aligns two raw series by nearest timestamp, then correlates the pairs.
pub fn correlate_series(a: &[PricePoint], b: &[PricePoint]) -> Correlation {
    correlate(&align(a, b))
}
