use super::util::{RetryPolicy, Sleeper, TokioSleeper, with_backoff};
use crate::core::config::ApiConfig;
use crate::core::error::FetchError;
use crate::core::rates::RateSource;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

/// Client for the ExchangeRate-API "latest rates" endpoint.
pub struct ExchangeRateApiClient {
    url: String,
    http: reqwest::Client,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for ExchangeRateApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The URL embeds the API key
        f.debug_struct("ExchangeRateApiClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ExchangeRateApiClient {
    /// Builds a client. Rejects a missing or placeholder key before any request.
    pub fn new(config: &ApiConfig) -> Result<Self, FetchError> {
        Self::with_sleeper(config, Arc::new(TokioSleeper::new()))
    }

    pub fn with_sleeper(config: &ApiConfig, sleeper: Arc<dyn Sleeper>) -> Result<Self, FetchError> {
        let key = config.key.trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            return Err(FetchError::MissingApiKey);
        }

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = reqwest::Client::builder()
            .user_agent("fxconv/1.0")
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| FetchError::ClientSetup(e.to_string()))?;

        Ok(Self {
            url: format!("{}{}/latest/{}", config.base_url, key, config.anchor_currency),
            http,
            policy: RetryPolicy::new(config.max_attempts, RetryPolicy::DEFAULT_BASE_DELAY),
            sleeper,
        })
    }

    async fn attempt(&self, attempt: u32) -> Result<String, FetchError> {
        debug!(attempt, "Requesting latest rates");
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::RetryableTransportFailure(transport_message(&e)))?;

        let status = response.status();
        debug!(%status, "Received rate provider response");
        match status {
            StatusCode::OK => response
                .text()
                .await
                .map_err(|e| FetchError::RetryableTransportFailure(transport_message(&e))),
            StatusCode::UNAUTHORIZED => Err(FetchError::AuthFailure),
            s if s.is_server_error() => Err(FetchError::RetryableServerFailure(s.as_u16())),
            s => Err(FetchError::ApiFailure(s.as_u16())),
        }
    }
}

// reqwest errors include the request URL, which carries the API key
fn transport_message(err: &reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_body() || err.is_decode() {
        "failed to read response body"
    } else {
        "request failed"
    };
    match std::error::Error::source(err) {
        Some(source) => format!("{kind}: {source}"),
        None => kind.to_string(),
    }
}

#[async_trait]
impl RateSource for ExchangeRateApiClient {
    #[instrument(name = "RateFetch", skip(self))]
    async fn fetch(&self) -> Result<String, FetchError> {
        with_backoff(
            |attempt| self.attempt(attempt),
            &self.policy,
            self.sleeper.as_ref(),
        )
        .await
    }
}
