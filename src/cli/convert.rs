use super::ui;
use crate::core::config::AppConfig;
use crate::core::{ConversionEngine, ConversionError, ConversionRecord};
use crate::providers::ExchangeRateApiClient;
use crate::providers::util::{TokioSleeper, cancel_channel};
use crate::store::HistoryStore;
use anyhow::{Context, Result};
use comfy_table::Cell;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

/// Parses a three letter currency code, normalizing to uppercase.
pub fn parse_currency_code(input: &str) -> Result<String, String> {
    let code = input.trim().to_ascii_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(format!(
            "invalid currency code '{input}': expected three letters, e.g. USD, ARS, BRL"
        ))
    }
}

/// Parses a strictly positive, finite amount.
pub fn parse_amount(input: &str) -> Result<f64, String> {
    let amount: f64 = input
        .trim()
        .parse()
        .map_err(|_| format!("invalid amount '{input}': expected a number"))?;
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(format!("invalid amount '{input}': must be greater than zero"))
    }
}

pub fn display_results(
    from: &str,
    amount: f64,
    results: &[(&str, Result<ConversionRecord, ConversionError>)],
) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("From"),
        ui::header_cell("Amount"),
        ui::header_cell("To"),
        ui::header_cell("Converted"),
        ui::header_cell("Rate"),
    ]);

    for (to, result) in results {
        match result {
            Ok(record) => table.add_row(vec![
                Cell::new(record.from()),
                ui::amount_cell(record.amount(), 2),
                Cell::new(record.to()),
                ui::result_cell(record.converted()),
                ui::amount_cell(record.rate(), 6),
            ]),
            Err(e) => table.add_row(vec![
                Cell::new(from),
                ui::amount_cell(amount, 2),
                Cell::new(to),
                ui::error_cell(&e.cause().to_string()),
                Cell::new(""),
            ]),
        };
    }

    table.to_string()
}

/// Converts `amount` into every target currency, one provider fetch per target.
pub async fn run(
    config: &AppConfig,
    history: Arc<HistoryStore>,
    from: &str,
    amount: f64,
    targets: &[String],
) -> Result<()> {
    let (cancel_tx, cancel_rx) = cancel_channel();
    let client = ExchangeRateApiClient::with_sleeper(
        &config.api,
        Arc::new(TokioSleeper::with_cancel(cancel_rx)),
    )
    .context("Cannot create rate provider client")?;
    let engine = ConversionEngine::new(client, Arc::clone(&history));

    // Ctrl-C stops pending retries instead of waiting out the backoff
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let pb = ui::new_spinner("Fetching exchange rates...");
    let conversions = targets.iter().map(|to| {
        let engine = &engine;
        async move { (to.as_str(), engine.convert(from, to, amount).await) }
    });
    let results = join_all(conversions).await;
    pb.finish_and_clear();
    interrupt.abort();

    if !config.history.auto_save {
        if let Err(e) = history.save().await {
            warn!(error = %e, "Failed to save history");
        }
    }

    println!("{}", display_results(from, amount, &results));

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    info!(total = results.len(), failed, "Conversions finished");
    match results.into_iter().find_map(|(_, r)| r.err()) {
        Some(first) => Err(anyhow::Error::new(first)
            .context(format!("{failed} of {} conversions failed", targets.len()))),
        None => Ok(()),
    }
}
