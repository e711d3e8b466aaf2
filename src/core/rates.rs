//! Rate source abstraction and payload extraction

use crate::core::error::{FetchError, RateError};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// Something that can hand back the raw "latest rates" payload.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch(&self) -> Result<String, FetchError>;
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: Option<String>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    base_code: Option<String>,
    conversion_rates: Option<HashMap<String, f64>>,
}

/// Rates of a single response, relative to the anchor currency.
#[derive(Debug, Clone)]
pub struct RateTable {
    base: Option<String>,
    rates: HashMap<String, f64>,
}

impl RateTable {
    pub fn parse(payload: &str) -> Result<Self, RateError> {
        let response: LatestRatesResponse = serde_json::from_str(payload)
            .map_err(|e| RateError::MalformedPayload(e.to_string()))?;

        let rates = match response.conversion_rates {
            Some(rates) => rates,
            None if response.result.as_deref() == Some("error") => {
                return Err(RateError::MalformedPayload(format!(
                    "provider reported error: {}",
                    response.error_type.as_deref().unwrap_or("unknown")
                )));
            }
            None => {
                return Err(RateError::MalformedPayload(
                    "missing conversion_rates".to_string(),
                ));
            }
        };

        Ok(Self {
            base: response.base_code,
            rates,
        })
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn rate(&self, code: &str) -> Result<f64, RateError> {
        self.rates
            .get(code)
            .copied()
            .ok_or_else(|| RateError::UnsupportedCurrency(code.to_string()))
    }
}

/// Pulls the source and destination rates out of a provider payload.
///
/// The source code is looked up first, so when both codes are missing the
/// error names the source.
pub fn extract(payload: &str, from: &str, to: &str) -> Result<(f64, f64), RateError> {
    let table = RateTable::parse(payload)?;
    debug!(base = ?table.base(), currencies = table.rates.len(), "Parsed rate table");
    let from_rate = table.rate(from)?;
    let to_rate = table.rate(to)?;
    Ok((from_rate, to_rate))
}
