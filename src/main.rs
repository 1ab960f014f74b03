use std::sync::Arc;
use anyhow::Context;
use price_stats::api::rest::{create_router, ApiState};
use price_stats::config::loader::AppConfig;
use price_stats::market_data::client::EvaluationClient;
use price_stats::observability::{metrics, tracing::init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
    let config = AppConfig::load(&env).context("loading configuration")?;

    init_tracing(&config.logging);
    metrics::register_metrics().context("registering metrics")?;

    if config.credentials.client_id.is_empty() {
        tracing::warn!("No upstream credentials configured; authentication will fail");
    }

    let provider = EvaluationClient::new(config.upstream.clone(), config.credentials.clone())
        .context("building upstream client")?;
    let router = create_router(Arc::new(ApiState {
        provider: Arc::new(provider),
    }));

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    tracing::info!("Server running on {} (upstream {})", addr, config.upstream.base_url);
    axum::serve(listener, router).await?;

    Ok(())
}
