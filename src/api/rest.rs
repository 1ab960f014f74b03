use axum::{
    Router,
    routing::get,
    extract::{Path, Query, State, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use crate::api::error::ApiError;
use crate::market_data::MarketDataProvider;
use crate::observability::metrics::{self, UNDEFINED_CORRELATIONS};
use crate::observability::tracing::{trace_correlation_request, trace_price_request};
use crate::stats::{self, Correlation};
use crate::types::price::PriceSeries;
use crate::types::ticker::Ticker;
use crate::utils::helper::round_to;
use crate::{AVERAGE_PRICE_DECIMALS, CORRELATION_DECIMALS};

const INVALID_PRICE_PARAMS: &str = "Invalid parameters";
const INVALID_CORRELATION_PARAMS: &str =
    "Invalid parameters: Provide `minutes` and exactly two `ticker` values";

pub struct ApiState {
    pub provider: Arc<dyn MarketDataProvider>,
}

pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(export_metrics))
        .route("/stocks", get(list_stocks))
        .route("/stocks/:ticker", get(get_average_price))
        .route("/stockcorrelation", get(get_correlation))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn export_metrics() -> Result<String, StatusCode> {
    metrics::gather().map_err(|e| {
        tracing::error!("Failed to encode metrics: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

async fn list_stocks(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stocks = state.provider.list_stocks()
        .await
        .map_err(ApiError::failed("Unable to fetch stock list"))?;

    Ok(Json(stocks))
}

/// Parses `minutes` as a strictly positive whole number.
fn parse_minutes(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|m| m.trim().parse::<u32>().ok())
        .filter(|&m| m > 0)
}

#[derive(Deserialize)]
struct AveragePriceQuery {
    minutes: Option<String>,
    aggregation: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AveragePriceResponse {
    average_stock_price: f64,
    price_history: PriceSeries,
}

async fn get_average_price(
    State(state): State<Arc<ApiState>>,
    Path(ticker): Path<String>,
    Query(query): Query<AveragePriceQuery>,
) -> Result<Response, ApiError> {
    let ticker = Ticker::parse(&ticker).ok();
    let minutes = parse_minutes(query.minutes.as_deref());
    let (ticker, minutes) = match (ticker, minutes, query.aggregation.as_deref()) {
        (Some(ticker), Some(minutes), Some("average")) => (ticker, minutes),
        _ => {
            metrics::record_request("average_price", "bad_request");
            return Err(ApiError::BadRequest(INVALID_PRICE_PARAMS));
        }
    };

    let span = trace_price_request(&ticker, minutes);
    compute_average_price(&state, ticker, minutes).instrument(span).await
}

async fn compute_average_price(state: &ApiState, ticker: Ticker, minutes: u32) -> Result<Response, ApiError> {
    tracing::info!("Fetching stock data for {} for last {} minutes", ticker, minutes);

    let price_history = state.provider.price_history(&ticker, minutes)
        .await
        .map_err(|e| {
            metrics::record_request("average_price", "error");
            tracing::error!("Average price request failed: {}", e);
            ApiError::failed("Unable to fetch average price")(e)
        })?;

    if price_history.is_empty() {
        tracing::info!("Empty price history for {}", ticker);
        metrics::record_request("average_price", "no_content");
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let average = stats::mean(&price_history)
        .map_err(ApiError::failed("Unable to fetch average price"))?;
    metrics::record_request("average_price", "ok");

    Ok(Json(AveragePriceResponse {
        average_stock_price: round_to(average, AVERAGE_PRICE_DECIMALS),
        price_history,
    }).into_response())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StockSummary {
    average_price: f64,
    price_history: PriceSeries,
}

/// Per-ticker summaries, serialized as a JSON object in request order.
#[derive(Default)]
struct StockSummaries(Vec<(Ticker, StockSummary)>);

impl StockSummaries {
    /// A repeated ticker keeps its position and takes the newer summary.
    fn insert(&mut self, ticker: Ticker, summary: StockSummary) {
        match self.0.iter_mut().find(|(t, _)| *t == ticker) {
            Some(entry) => entry.1 = summary,
            None => self.0.push((ticker, summary)),
        }
    }
}

impl Serialize for StockSummaries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(ticker, summary)| (ticker.as_str(), summary)))
    }
}

#[derive(Serialize)]
struct CorrelationResponse {
    correlation: f64,
    stocks: StockSummaries,
}

/// Pulls `minutes` and the repeated `ticker` values out of the raw query pairs.
fn parse_correlation_query(pairs: &[(String, String)]) -> Option<(u32, Ticker, Ticker)> {
    let minutes = pairs.iter()
        .find(|(k, _)| k == "minutes")
        .and_then(|(_, v)| parse_minutes(Some(v.as_str())))?;

    let tickers: Vec<&str> = pairs.iter()
        .filter(|(k, _)| k == "ticker")
        .map(|(_, v)| v.as_str())
        .collect();

    match tickers.as_slice() {
        [first, second] => Some((minutes, Ticker::parse(first).ok()?, Ticker::parse(second).ok()?)),
        _ => None,
    }
}

async fn get_correlation(
    State(state): State<Arc<ApiState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let Some((minutes, first, second)) = parse_correlation_query(&pairs) else {
        metrics::record_request("correlation", "bad_request");
        return Err(ApiError::BadRequest(INVALID_CORRELATION_PARAMS));
    };

    let span = trace_correlation_request(&first, &second, minutes);
    compute_correlation(&state, first, second, minutes).instrument(span).await
}

async fn compute_correlation(
    state: &ApiState,
    first: Ticker,
    second: Ticker,
    minutes: u32,
) -> Result<Response, ApiError> {
    // Both histories are fetched in parallel
    let (history_a, history_b) = tokio::try_join!(
        state.provider.price_history(&first, minutes),
        state.provider.price_history(&second, minutes),
    ).map_err(|e| {
        metrics::record_request("correlation", "error");
        tracing::error!("Correlation request failed: {}", e);
        ApiError::failed("Unable to fetch correlation")(e)
    })?;

    if history_a.is_empty() || history_b.is_empty() {
        tracing::info!(
            "No data to correlate: {}={} points, {}={} points",
            first, history_a.len(), second, history_b.len()
        );
        metrics::record_request("correlation", "no_content");
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let avg_a = stats::mean(&history_a).map_err(ApiError::failed("Unable to fetch correlation"))?;
    let avg_b = stats::mean(&history_b).map_err(ApiError::failed("Unable to fetch correlation"))?;

    let correlation = stats::correlate_series(&history_a, &history_b);
    if let Correlation::Undefined(reason) = correlation {
        UNDEFINED_CORRELATIONS.inc();
        tracing::warn!("Correlation undefined ({:?}), reporting 0", reason);
    }
    metrics::record_request("correlation", "ok");

    let mut stocks = StockSummaries::default();
    stocks.insert(first, StockSummary {
        average_price: round_to(avg_a, AVERAGE_PRICE_DECIMALS),
        price_history: history_a,
    });
    stocks.insert(second, StockSummary {
        average_price: round_to(avg_b, AVERAGE_PRICE_DECIMALS),
        price_history: history_b,
    });

    Ok(Json(CorrelationResponse {
        correlation: round_to(correlation.value(), CORRELATION_DECIMALS),
        stocks,
    }).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use crate::error::Error;
    use crate::market_data::MockMarketDataProvider;
    use crate::types::price::PricePoint;

    fn series(points: &[(i64, f64)]) -> PriceSeries {
        points.iter().map(|&(t, p)| PricePoint::from_millis(t, p).unwrap()).collect()
    }

    fn router(provider: MockMarketDataProvider) -> Router {
        create_router(Arc::new(ApiState { provider: Arc::new(provider) }))
    }

    async fn call(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, body)
    }

    #[test]
    fn test_parse_minutes() {
        assert_eq!(parse_minutes(Some("30")), Some(30));
        assert_eq!(parse_minutes(Some("0")), None);
        assert_eq!(parse_minutes(Some("-5")), None);
        assert_eq!(parse_minutes(Some("abc")), None);
        assert_eq!(parse_minutes(None), None);
    }

    #[test]
    fn test_parse_correlation_query_requires_two_tickers() {
        let q = |pairs: &[(&str, &str)]| -> Vec<(String, String)> {
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };

        assert!(parse_correlation_query(&q(&[("minutes", "10"), ("ticker", "A")])).is_none());
        assert!(parse_correlation_query(&q(&[("minutes", "10"), ("ticker", "A"), ("ticker", "B"), ("ticker", "C")])).is_none());
        assert!(parse_correlation_query(&q(&[("ticker", "A"), ("ticker", "B")])).is_none());

        let (minutes, a, b) = parse_correlation_query(&q(&[("ticker", "A"), ("minutes", "10"), ("ticker", "B")])).unwrap();
        assert_eq!((minutes, a.as_str(), b.as_str()), (10, "A", "B"));
    }

    fn summary(average_price: f64) -> StockSummary {
        StockSummary { average_price, price_history: Vec::new() }
    }

    #[test]
    fn test_stock_summaries_keep_request_order() {
        let mut stocks = StockSummaries::default();
        stocks.insert(Ticker::parse("PYPL").unwrap(), summary(1.0));
        stocks.insert(Ticker::parse("NVDA").unwrap(), summary(2.0));

        let raw = serde_json::to_string(&CorrelationResponse { correlation: 0.5, stocks }).unwrap();
        let pypl = raw.find("\"PYPL\"").unwrap();
        let nvda = raw.find("\"NVDA\"").unwrap();
        assert!(pypl < nvda, "{raw}");
    }

    #[test]
    fn test_stock_summaries_repeated_ticker_takes_latest() {
        let mut stocks = StockSummaries::default();
        stocks.insert(Ticker::parse("NVDA").unwrap(), summary(1.0));
        stocks.insert(Ticker::parse("NVDA").unwrap(), summary(2.0));

        let value = serde_json::to_value(&stocks).unwrap();
        assert_eq!(value, json!({"NVDA": {"averagePrice": 2.0, "priceHistory": []}}));
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(MockMarketDataProvider::new())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_average_price() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_price_history()
            .withf(|ticker, minutes| ticker.as_str() == "NVDA" && *minutes == 30)
            .times(1)
            .returning(|_, _| Ok(series(&[(0, 100.0), (60_000, 200.0), (120_000, 100.0000015)])));

        let (status, body) = call(router(provider), "/stocks/NVDA?minutes=30&aggregation=average").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["averageStockPrice"], json!(133.333334));
        assert_eq!(body["priceHistory"].as_array().unwrap().len(), 3);
        assert_eq!(body["priceHistory"][1]["price"], json!(200.0));
        assert!(body["priceHistory"][0]["lastUpdatedAt"].is_string());
    }

    #[tokio::test]
    async fn test_average_price_rejects_bad_params() {
        for uri in [
            "/stocks/NVDA?minutes=30",
            "/stocks/NVDA?minutes=30&aggregation=median",
            "/stocks/NVDA?minutes=0&aggregation=average",
            "/stocks/NVDA?minutes=abc&aggregation=average",
            "/stocks/NVDA?aggregation=average",
        ] {
            let mut provider = MockMarketDataProvider::new();
            provider.expect_price_history().never();

            let (status, body) = call(router(provider), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], "Invalid parameters");
        }
    }

    #[tokio::test]
    async fn test_average_price_rejects_ticker_with_url_metacharacters() {
        for uri in [
            "/stocks/EVIL%3Fminutes%3D99999%23?minutes=5&aggregation=average",
            "/stocks/..?minutes=5&aggregation=average",
            "/stocks/A%2Fauth?minutes=5&aggregation=average",
        ] {
            let mut provider = MockMarketDataProvider::new();
            provider.expect_price_history().never();

            let (status, body) = call(router(provider), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], "Invalid parameters");
        }
    }

    #[tokio::test]
    async fn test_correlation_rejects_ticker_with_url_metacharacters() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_price_history().never();

        let (status, body) = call(
            router(provider),
            "/stockcorrelation?minutes=5&ticker=NVDA&ticker=EVIL%3Fminutes%3D99999%23",
        ).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], INVALID_CORRELATION_PARAMS);
    }

    #[tokio::test]
    async fn test_average_price_empty_history_is_no_content() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_price_history().returning(|_, _| Ok(Vec::new()));

        let (status, body) = call(router(provider), "/stocks/NVDA?minutes=5&aggregation=average").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn test_average_price_upstream_error() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_price_history().returning(|_, _| Err(Error::Upstream {
            status: 404,
            body: json!({"message": "unknown ticker"}),
        }));

        let (status, body) = call(router(provider), "/stocks/XXXX?minutes=5&aggregation=average").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Unable to fetch average price");
        assert_eq!(body["details"]["message"], "unknown ticker");
    }

    #[tokio::test]
    async fn test_correlation() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_price_history()
            .withf(|ticker, _| ticker.as_str() == "NVDA")
            .returning(|_, _| Ok(series(&[(0, 1.0), (60_000, 2.0), (120_000, 3.0)])));
        provider.expect_price_history()
            .withf(|ticker, _| ticker.as_str() == "PYPL")
            .returning(|_, _| Ok(series(&[(119_000, 2.0), (1_000, 6.0), (61_000, 4.0)])));

        let (status, body) = call(router(provider), "/stockcorrelation?minutes=50&ticker=NVDA&ticker=PYPL").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["correlation"], json!(-1.0));
        assert_eq!(body["stocks"]["NVDA"]["averagePrice"], json!(2.0));
        assert_eq!(body["stocks"]["PYPL"]["averagePrice"], json!(4.0));
        assert_eq!(body["stocks"]["PYPL"]["priceHistory"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_correlation_single_points_report_zero() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_price_history()
            .returning(|_, _| Ok(series(&[(0, 10.0)])));

        let (status, body) = call(router(provider), "/stockcorrelation?minutes=5&ticker=A&ticker=B").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["correlation"], json!(0.0));
    }

    #[tokio::test]
    async fn test_correlation_requires_two_tickers() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_price_history().never();

        let (status, body) = call(router(provider), "/stockcorrelation?minutes=50&ticker=NVDA").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], INVALID_CORRELATION_PARAMS);
    }

    #[tokio::test]
    async fn test_correlation_empty_side_is_no_content() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_price_history()
            .withf(|ticker, _| ticker.as_str() == "A")
            .returning(|_, _| Ok(series(&[(0, 1.0), (1, 2.0)])));
        provider.expect_price_history()
            .withf(|ticker, _| ticker.as_str() == "B")
            .returning(|_, _| Ok(Vec::new()));

        let (status, _) = call(router(provider), "/stockcorrelation?minutes=5&ticker=A&ticker=B").await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_correlation_transport_error() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_price_history()
            .returning(|_, _| Err(Error::Transport("connection refused".to_string())));

        let (status, body) = call(router(provider), "/stockcorrelation?minutes=5&ticker=A&ticker=B").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Unable to fetch correlation");
    }

    #[tokio::test]
    async fn test_list_stocks_passthrough() {
        let mut provider = MockMarketDataProvider::new();
        provider.expect_list_stocks()
            .returning(|| Ok(json!({"stocks": {"Nvidia Corporation": "NVDA"}})));

        let (status, body) = call(router(provider), "/stocks").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stocks"]["Nvidia Corporation"], "NVDA");
    }
}
