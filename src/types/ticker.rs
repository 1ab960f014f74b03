use serde::{Deserialize, Serialize};
use std::fmt;
use crate::error::{Error, Result};

/// Instrument symbol, e.g. `NVDA` or `BRK.B`.
///
/// Only ASCII letters, digits, `.` and `-` are accepted, starting with a
/// letter or digit, so a ticker can be placed in an upstream URL path as-is.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidParameters("empty ticker".to_string()));
        }
        // Leading alphanumeric also rules out `.` and `..` path segments
        let leads_alphanumeric = trimmed.starts_with(|c: char| c.is_ascii_alphanumeric());
        if !leads_alphanumeric
            || !trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(Error::InvalidParameters(format!("invalid ticker: {:?}", trimmed)));
        }
        Ok(Ticker(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
