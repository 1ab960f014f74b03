//! Price statistics engine.
//!
//! Pure functions over already-fetched price series. Nothing in here performs
//! I/O, logs, or holds state between calls.

pub mod aggregator;
pub mod alignment;
pub mod correlation;

pub use aggregator::mean;
pub use alignment::{align, AlignedPair};
pub use correlation::{correlate, correlate_series, Correlation, UndefinedReason};
