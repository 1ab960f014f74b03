use serde::{Deserialize, Serialize};

pub mod server;
pub mod upstream;
pub mod loader;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            json: false,
            filter: "info".to_string(),
        }
    }
}
