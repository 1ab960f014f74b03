use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use crate::config::upstream::{Credentials, UpstreamConfig};
use crate::error::{Error, Result};
use crate::observability::metrics::TOKEN_REFRESHES;

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    email: &'a str,
    name: &'a str,
    #[serde(rename = "rollNo")]
    roll_no: &'a str,
    #[serde(rename = "accessCode")]
    access_code: &'a str,
    #[serde(rename = "clientID")]
    client_id: &'a str,
    #[serde(rename = "clientSecret")]
    client_secret: &'a str,
}

impl<'a> From<&'a Credentials> for AuthRequest<'a> {
    fn from(c: &'a Credentials) -> Self {
        AuthRequest {
            email: &c.email,
            name: &c.name,
            roll_no: &c.roll_no,
            access_code: &c.access_code,
            client_id: &c.client_id,
            client_secret: &c.client_secret,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
    /// Token lifetime in seconds.
    expires_in: u64,
}

#[derive(Clone, Debug)]
struct CachedToken {
    value: String,
    valid_until: Instant,
}

/// Lazily obtains a bearer token and reuses it until shortly before it expires.
///
/// No background refresh: an expired token is replaced by whichever request
/// notices first.
pub struct TokenCache {
    http: reqwest::Client,
    auth_url: String,
    credentials: Credentials,
    expiry_margin: Duration,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(http: reqwest::Client, config: &UpstreamConfig, credentials: Credentials) -> Self {
        TokenCache {
            http,
            auth_url: config.url("auth"),
            credentials,
            expiry_margin: config.token_expiry_margin(),
            cached: RwLock::new(None),
        }
    }

    pub async fn bearer_token(&self) -> Result<String> {
        if let Some(token) = self.valid_token(&*self.cached.read().await) {
            return Ok(token);
        }

        let mut cached = self.cached.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(token) = self.valid_token(&cached) {
            return Ok(token);
        }

        let fresh = self.fetch().await.map_err(|e| {
            tracing::error!("Authentication failed: {}", e);
            Error::AuthenticationError("Failed to authenticate with the service".to_string())
        })?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    fn valid_token(&self, cached: &Option<CachedToken>) -> Option<String> {
        cached.as_ref()
            .filter(|t| Instant::now() < t.valid_until)
            .map(|t| t.value.clone())
    }

    async fn fetch(&self) -> Result<CachedToken> {
        let response = self.http
            .post(&self.auth_url)
            .json(&AuthRequest::from(&self.credentials))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json().await.unwrap_or(serde_json::Value::Null);
            return Err(Error::Upstream { status: status.as_u16(), body });
        }

        let auth: AuthResponse = response.json().await?;
        TOKEN_REFRESHES.inc();
        tracing::info!("Obtained bearer token valid for {}s", auth.expires_in);

        let lifetime = Duration::from_secs(auth.expires_in).saturating_sub(self.expiry_margin);
        Ok(CachedToken {
            value: auth.access_token,
            valid_until: Instant::now() + lifetime,
        })
    }
}
