use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Cached tokens are dropped this long before the provider says they expire.
    pub token_expiry_margin_secs: u64,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn token_expiry_margin(&self) -> Duration {
        Duration::from_secs(self.token_expiry_margin_secs)
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/'),
        )
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            base_url: "http://20.244.56.144/evaluation-service".to_string(),
            timeout_secs: 10,
            token_expiry_margin_secs: 300,  // 5 minutes
        }
    }
}

/// Registration details exchanged for a bearer token.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub name: String,
    pub roll_no: String,
    pub access_code: String,
    pub client_id: String,
    pub client_secret: String,
}
