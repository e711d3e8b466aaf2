//! Conversion records and the fetch -> extract -> compute -> record pipeline

use crate::core::error::{ConversionError, FailureCause, RateError};
use crate::core::rates::{self, RateSource};
use crate::store::history::HistoryStore;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// A single completed conversion. Immutable once created.
///
/// Only the two amounts are stored; the rate is derived from them on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    id: String,
    timestamp: DateTime<Local>,
    from: String,
    to: String,
    amount: f64,
    converted: f64,
}

impl ConversionRecord {
    pub fn new(from: &str, to: &str, amount: f64, converted: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Local::now(),
            from: from.to_string(),
            to: to.to_string(),
            amount,
            converted,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn converted(&self) -> f64 {
        self.converted
    }

    pub fn rate(&self) -> f64 {
        self.converted / self.amount
    }
}

fn check_rate(code: &str, rate: f64) -> Result<f64, RateError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(RateError::InvalidRate {
            code: code.to_string(),
            rate,
        })
    }
}

/// Converts through the anchor currency: `amount / from_rate * to_rate`.
/// The result must be finite.
pub fn convert_amount(
    amount: f64,
    (from, from_rate): (&str, f64),
    (to, to_rate): (&str, f64),
) -> Result<f64, RateError> {
    let from_rate = check_rate(from, from_rate)?;
    let to_rate = check_rate(to, to_rate)?;
    let converted = (amount / from_rate) * to_rate;
    if !converted.is_finite() {
        return Err(RateError::AmountOutOfRange {
            from: from.to_string(),
            to: to.to_string(),
            amount,
        });
    }
    Ok(converted)
}

pub struct ConversionEngine<S: RateSource> {
    source: S,
    history: Arc<HistoryStore>,
}

impl<S: RateSource> ConversionEngine<S> {
    pub fn new(source: S, history: Arc<HistoryStore>) -> Self {
        Self { source, history }
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    #[instrument(name = "Convert", skip(self))]
    pub async fn convert(
        &self,
        from: &str,
        to: &str,
        amount: f64,
    ) -> Result<ConversionRecord, ConversionError> {
        let failed = |source: FailureCause| ConversionError::ConversionFailed {
            from: from.to_string(),
            to: to.to_string(),
            source,
        };

        let payload = self.source.fetch().await.map_err(|e| failed(e.into()))?;
        let (from_rate, to_rate) =
            rates::extract(&payload, from, to).map_err(|e| failed(e.into()))?;
        debug!(from_rate, to_rate, "Extracted rates");

        let converted = convert_amount(amount, (from, from_rate), (to, to_rate))
            .map_err(|e| failed(e.into()))?;

        let record = ConversionRecord::new(from, to, amount, converted);
        self.history.append(record.clone()).await;
        info!(id = %record.id(), amount, converted, "Conversion recorded");

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FetchError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct StaticSource {
        payload: Result<String, u16>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn ok(payload: &str) -> Self {
            Self {
                payload: Ok(payload.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                payload: Err(status),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RateSource for StaticSource {
        async fn fetch(&self) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.payload {
                Ok(body) => Ok(body.clone()),
                Err(status) => Err(FetchError::ApiFailure(*status)),
            }
        }
    }

    const PAYLOAD: &str = r#"{
        "result": "success",
        "base_code": "USD",
        "conversion_rates": {"USD": 1.0, "ARS": 1000.0, "BRL": 5.0, "KWD": 0.3, "ZZZ": 0.0}
    }"#;

    async fn history(dir: &TempDir) -> Arc<HistoryStore> {
        Arc::new(HistoryStore::open(dir.path().join("history.json"), false).await)
    }

    #[tokio::test]
    async fn test_convert_through_anchor() {
        let dir = TempDir::new().unwrap();
        let engine = ConversionEngine::new(StaticSource::ok(PAYLOAD), history(&dir).await);

        let record = engine.convert("BRL", "ARS", 50.0).await.unwrap();

        let expected = 50.0 / 5.0 * 1000.0;
        assert!((record.converted() - expected).abs() < 1e-9);
        assert_eq!(record.from(), "BRL");
        assert_eq!(record.to(), "ARS");
        assert_eq!(record.amount(), 50.0);
        assert!((record.rate() - 200.0).abs() < 1e-9);

        let records = engine.history().records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0], record);
    }

    #[tokio::test]
    async fn test_each_conversion_appends_one_record() {
        let dir = TempDir::new().unwrap();
        let engine = ConversionEngine::new(StaticSource::ok(PAYLOAD), history(&dir).await);

        for amount in [1.0, 2.5, 1234.56] {
            let record = engine.convert("USD", "BRL", amount).await.unwrap();
            assert!((record.converted() - amount * 5.0).abs() < 1e-9);
        }

        assert_eq!(engine.history().records().await.len(), 3);
        assert_eq!(engine.source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unsupported_currency_records_nothing() {
        let dir = TempDir::new().unwrap();
        let engine = ConversionEngine::new(StaticSource::ok(PAYLOAD), history(&dir).await);

        let err = engine.convert("USD", "EUR", 10.0).await.unwrap_err();
        assert!(matches!(
            err.cause(),
            FailureCause::Rate(RateError::UnsupportedCurrency(code)) if code == "EUR"
        ));
        assert!(engine.history().records().await.is_empty());
    }

    #[tokio::test]
    async fn test_zero_rate_is_rejected() {
        let dir = TempDir::new().unwrap();
        let engine = ConversionEngine::new(StaticSource::ok(PAYLOAD), history(&dir).await);

        let err = engine.convert("ZZZ", "USD", 10.0).await.unwrap_err();
        assert!(matches!(
            err.cause(),
            FailureCause::Rate(RateError::InvalidRate { code, .. }) if code == "ZZZ"
        ));
        assert!(engine.history().records().await.is_empty());
    }

    #[tokio::test]
    async fn test_overflowing_amount_keeps_saved_history() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let store = Arc::new(HistoryStore::open(&path, true).await);
        let engine = ConversionEngine::new(StaticSource::ok(PAYLOAD), Arc::clone(&store));

        let kept = engine.convert("USD", "KWD", 10.0).await.unwrap();
        let err = engine.convert("KWD", "USD", 1.7e308).await.unwrap_err();
        assert!(matches!(
            err.cause(),
            FailureCause::Rate(RateError::AmountOutOfRange { from, to, .. })
                if from == "KWD" && to == "USD"
        ));
        assert_eq!(store.records().await, vec![kept.clone()]);

        let reopened = HistoryStore::open(&path, true).await;
        assert_eq!(reopened.records().await, vec![kept]);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_wrapped() {
        let dir = TempDir::new().unwrap();
        let engine = ConversionEngine::new(StaticSource::failing(429), history(&dir).await);

        let err = engine.convert("USD", "ARS", 10.0).await.unwrap_err();
        assert!(matches!(
            err.cause(),
            FailureCause::Fetch(FetchError::ApiFailure(429))
        ));
        assert!(err.to_string().contains("429"));
        assert!(engine.history().records().await.is_empty());
    }

    #[test]
    fn test_convert_amount_rejects_bad_rates() {
        assert!(convert_amount(1.0, ("USD", f64::NAN), ("ARS", 1.0)).is_err());
        assert!(convert_amount(1.0, ("USD", 1.0), ("ARS", -2.0)).is_err());
        assert!(convert_amount(1.0, ("USD", f64::INFINITY), ("ARS", 1.0)).is_err());
        assert!(matches!(
            convert_amount(f64::MAX, ("USD", 1.0), ("ARS", 2.0)),
            Err(RateError::AmountOutOfRange { .. })
        ));
        assert_eq!(
            convert_amount(10.0, ("USD", 2.0), ("ARS", 3.0)).unwrap(),
            15.0
        );
    }
}
