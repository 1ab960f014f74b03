use crate::config::LoggingConfig;
use crate::config::server::ServerConfig;
use crate::config::upstream::{Credentials, UpstreamConfig};
use crate::error::{Error, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub credentials: Credentials,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        Self::load_from("config", env)
    }

    /// Layers `{dir}/default`, `{dir}/{env}`, `PRICESTATS__*` variables and `PORT`.
    pub fn load_from(dir: &str, env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(&format!("{}/default", dir)).required(false))
            .add_source(File::with_name(&format!("{}/{}", dir, env)).required(false))
            .add_source(
                Environment::with_prefix("PRICESTATS")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .set_override_option("server.port", std::env::var("PORT").ok())
            .map_err(|e| Error::ConfigError(e.to_string()))?
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))
    }
}
