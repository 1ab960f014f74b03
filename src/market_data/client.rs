use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use std::time::Instant;
use crate::config::upstream::{Credentials, UpstreamConfig};
use crate::error::{Error, Result};
use crate::market_data::auth::TokenCache;
use crate::market_data::{HistoryPayload, MarketDataProvider};
use crate::observability::metrics::{UPSTREAM_ERRORS, UPSTREAM_LATENCY, UPSTREAM_REQUESTS};
use crate::types::price::PriceSeries;
use crate::types::ticker::Ticker;

/// HTTP client for the evaluation service's market-data API.
pub struct EvaluationClient {
    http: reqwest::Client,
    config: UpstreamConfig,
    tokens: TokenCache,
}

impl EvaluationClient {
    pub fn new(config: UpstreamConfig, credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        let tokens = TokenCache::new(http.clone(), &config, credentials);

        Ok(EvaluationClient { http, config, tokens })
    }

    async fn get_json<T>(&self, path: &str, params: &[(&str, String)]) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let token = self.tokens.bearer_token().await?;
        let url = self.config.url(path);

        UPSTREAM_REQUESTS.inc();
        let started = Instant::now();
        let sent = self.http
            .get(&url)
            .query(params)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(ACCEPT, "application/json")
            .send()
            .await;
        UPSTREAM_LATENCY.observe(started.elapsed().as_secs_f64());

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                UPSTREAM_ERRORS.inc();
                tracing::error!("No response received: url={} params={:?} error={}", url, params, e);
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            UPSTREAM_ERRORS.inc();
            let body = response.json().await.unwrap_or(serde_json::Value::Null);
            tracing::error!(
                "API error: status={} url={} params={:?} body={}",
                status, url, params, body
            );
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.tokens.invalidate().await;
            }
            return Err(Error::Upstream { status: status.as_u16(), body });
        }

        response.json().await.map_err(|e| {
            UPSTREAM_ERRORS.inc();
            Error::DeserializationError(format!("{}: {}", url, e))
        })
    }
}

#[async_trait]
impl MarketDataProvider for EvaluationClient {
    async fn list_stocks(&self) -> Result<serde_json::Value> {
        self.get_json("stocks", &[]).await
    }

    async fn price_history(&self, ticker: &Ticker, minutes: u32) -> Result<PriceSeries> {
        tracing::debug!("Fetching stock data for {} for last {} minutes", ticker, minutes);

        let payload: Option<HistoryPayload> = self
            .get_json(&format!("stocks/{}", ticker), &[("minutes", minutes.to_string())])
            .await?;
        Ok(HistoryPayload::into_series(payload))
    }
}
