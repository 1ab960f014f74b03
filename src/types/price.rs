use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed trade price as reported by the market-data provider.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    #[serde(rename = "lastUpdatedAt")]
    pub timestamp: DateTime<Utc>,
}

impl PricePoint {
    pub fn new(price: f64, timestamp: DateTime<Utc>) -> Self {
        PricePoint { price, timestamp }
    }

    /// `None` when `millis` is outside chrono's representable range.
    pub fn from_millis(millis: i64, price: f64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis)
            .map(|timestamp| PricePoint { price, timestamp })
    }

    /// Milliseconds since epoch.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Provider order, not necessarily sorted by timestamp.
pub type PriceSeries = Vec<PricePoint>;
