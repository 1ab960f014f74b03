use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use crate::error::{Error, Result};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Request metrics
    pub static ref STATS_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("stats_requests_total", "Statistics requests by endpoint and outcome"),
        &["endpoint", "outcome"]
    ).expect("valid stats_requests_total definition");

    pub static ref UNDEFINED_CORRELATIONS: IntCounter = IntCounter::new(
        "undefined_correlations_total",
        "Correlation requests answered with the degenerate sentinel"
    ).expect("valid undefined_correlations_total definition");

    // Upstream metrics
    pub static ref UPSTREAM_REQUESTS: IntCounter = IntCounter::new(
        "upstream_requests_total",
        "Total number of requests sent to the market-data provider"
    ).expect("valid upstream_requests_total definition");

    pub static ref UPSTREAM_ERRORS: IntCounter = IntCounter::new(
        "upstream_errors_total",
        "Market-data requests that failed or returned a non-success status"
    ).expect("valid upstream_errors_total definition");

    pub static ref TOKEN_REFRESHES: IntCounter = IntCounter::new(
        "token_refreshes_total",
        "Bearer tokens obtained from the auth endpoint"
    ).expect("valid token_refreshes_total definition");

    // Latency metrics
    pub static ref UPSTREAM_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "upstream_latency_seconds",
            "Market-data request latency"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    ).expect("valid upstream_latency_seconds definition");
}

pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(STATS_REQUESTS.clone()))?;
    REGISTRY.register(Box::new(UNDEFINED_CORRELATIONS.clone()))?;
    REGISTRY.register(Box::new(UPSTREAM_REQUESTS.clone()))?;
    REGISTRY.register(Box::new(UPSTREAM_ERRORS.clone()))?;
    REGISTRY.register(Box::new(TOKEN_REFRESHES.clone()))?;
    REGISTRY.register(Box::new(UPSTREAM_LATENCY.clone()))?;
    Ok(())
}

pub fn record_request(endpoint: &str, outcome: &str) {
    STATS_REQUESTS.with_label_values(&[endpoint, outcome]).inc();
}

/// Text exposition of everything in [`REGISTRY`].
pub fn gather() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| Error::MetricsError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_exposes_registered_metrics() {
        // Another test may already have registered
        let _ = register_metrics();
        record_request("average_price", "ok");

        let text = gather().unwrap();
        assert!(text.contains("stats_requests_total"));
    }
}
