use tracing::Span;
use tracing_subscriber::EnvFilter;
use crate::config::LoggingConfig;
use crate::types::ticker::Ticker;

/// Installs the global subscriber. `RUST_LOG` wins over the configured filter.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = installed {
        eprintln!("tracing subscriber already installed: {}", e);
    }
}

pub fn trace_price_request(ticker: &Ticker, minutes: u32) -> Span {
    tracing::info_span!(
        "average_price",
        ticker = %ticker,
        minutes,
    )
}

pub fn trace_correlation_request(first: &Ticker, second: &Ticker, minutes: u32) -> Span {
    tracing::info_span!(
        "correlation",
        first = %first,
        second = %second,
        minutes,
    )
}
