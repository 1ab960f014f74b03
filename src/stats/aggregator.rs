use crate::error::{Error, Result};
use crate::types::price::PricePoint;

/// Arithmetic mean of the `price` field.
///
/// An empty series has no mean: callers are expected to treat it as a
/// "no data" outcome before getting here.
pub fn mean(series: &[PricePoint]) -> Result<f64> {
    if series.is_empty() {
        return Err(Error::DivisionByZero);
    }

    let sum: f64 = series.iter().map(|p| p.price).sum();
    Ok(sum / series.len() as f64)
}
