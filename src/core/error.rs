//! Failure types for the fetch, extraction, conversion and history layers

use std::path::PathBuf;
use thiserror::Error;

/// Outcome of a failed rate fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("API key is missing or still set to the placeholder value")]
    MissingApiKey,

    #[error("API key rejected by the rate provider (HTTP 401)")]
    AuthFailure,

    #[error("rate provider returned unexpected status {0}")]
    ApiFailure(u16),

    #[error("rate provider unavailable (HTTP {0})")]
    RetryableServerFailure(u16),

    #[error("connection error: {0}")]
    RetryableTransportFailure(String),

    #[error("rate provider unreachable after {attempts} attempts: {last}")]
    ExhaustedRetries { attempts: u32, last: Box<FetchError> },

    #[error("retry interrupted while waiting for the next attempt")]
    Interrupted,

    #[error("failed to set up the HTTP client: {0}")]
    ClientSetup(String),
}

impl FetchError {
    /// Only server errors and transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::RetryableServerFailure(_) | FetchError::RetryableTransportFailure(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum RateError {
    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("malformed rate payload: {0}")]
    MalformedPayload(String),

    #[error("invalid rate {rate} for currency {code}")]
    InvalidRate { code: String, rate: f64 },

    #[error("converting {amount} {from} to {to} does not give a finite amount")]
    AmountOutOfRange { from: String, to: String, amount: f64 },
}

#[derive(Debug, Error)]
pub enum FailureCause {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Rate(#[from] RateError),
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("conversion {from} -> {to} failed: {source}")]
    ConversionFailed {
        from: String,
        to: String,
        #[source]
        source: FailureCause,
    },
}

impl ConversionError {
    pub fn cause(&self) -> &FailureCause {
        match self {
            ConversionError::ConversionFailed { source, .. } => source,
        }
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::RetryableServerFailure(503).is_retryable());
        assert!(FetchError::RetryableTransportFailure("reset".into()).is_retryable());
        assert!(!FetchError::AuthFailure.is_retryable());
        assert!(!FetchError::ApiFailure(429).is_retryable());
        assert!(!FetchError::Interrupted.is_retryable());
        assert!(!FetchError::ClientSetup("no TLS backend".into()).is_retryable());
        assert!(
            !FetchError::ExhaustedRetries {
                attempts: 3,
                last: Box::new(FetchError::RetryableServerFailure(500)),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_conversion_error_keeps_cause() {
        let err = ConversionError::ConversionFailed {
            from: "USD".into(),
            to: "XYZ".into(),
            source: RateError::UnsupportedCurrency("XYZ".into()).into(),
        };
        assert_eq!(
            err.to_string(),
            "conversion USD -> XYZ failed: unsupported currency: XYZ"
        );
        let source = std::error::Error::source(&err).expect("cause should be preserved");
        assert_eq!(source.to_string(), "unsupported currency: XYZ");
        assert!(matches!(
            err.cause(),
            FailureCause::Rate(RateError::UnsupportedCurrency(code)) if code == "XYZ"
        ));
    }

    #[test]
    fn test_exhausted_message_names_last_cause() {
        let err = FetchError::ExhaustedRetries {
            attempts: 3,
            last: Box::new(FetchError::RetryableServerFailure(502)),
        };
        assert_eq!(
            err.to_string(),
            "rate provider unreachable after 3 attempts: rate provider unavailable (HTTP 502)"
        );
    }
}
