pub mod auth;
pub mod client;

use async_trait::async_trait;
use serde::Deserialize;
use crate::error::Result;
use crate::types::price::{PricePoint, PriceSeries};
use crate::types::ticker::Ticker;

/// Source of price histories and the stock catalogue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Catalogue exactly as the provider reports it.
    async fn list_stocks(&self) -> Result<serde_json::Value>;

    /// Prices observed for `ticker` during the last `minutes` minutes, in provider order.
    async fn price_history(&self, ticker: &Ticker, minutes: u32) -> Result<PriceSeries>;
}

/// The provider answers with an array, a bare record, or `null`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum HistoryPayload {
    Many(Vec<PricePoint>),
    One(PricePoint),
}

impl HistoryPayload {
    pub(crate) fn into_series(payload: Option<HistoryPayload>) -> PriceSeries {
        match payload {
            Some(HistoryPayload::Many(points)) => points,
            Some(HistoryPayload::One(point)) => vec![point],
            None => Vec::new(),
        }
    }
}
