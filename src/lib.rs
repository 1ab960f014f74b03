pub mod types;
pub mod stats;
pub mod market_data;
pub mod error;
pub mod config;
pub mod observability;
pub mod api;
pub mod utils;

// Presentation precision
pub const AVERAGE_PRICE_DECIMALS: u32 = 6;
pub const CORRELATION_DECIMALS: u32 = 4;
