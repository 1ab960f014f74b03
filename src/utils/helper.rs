/// Rounds to a fixed number of decimal places for presentation.
///
/// Only response shaping calls this; statistics stay unrounded so composed
/// computations don't accumulate rounding error.
pub fn round_to(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(places as i32);
    let rounded = (value * factor).round() / factor;
    // Avoid serializing -0.0
    if rounded == 0.0 { 0.0 } else { rounded }
}
