use super::ui;
use crate::core::ConversionRecord;
use crate::store::HistoryStore;
use anyhow::{Context, Result};
use comfy_table::Cell;
use std::path::Path;

pub fn display_as_table(records: &[ConversionRecord]) -> String {
    if records.is_empty() {
        return ui::style_text("The conversion history is empty", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date and Time"),
        ui::header_cell("From"),
        ui::header_cell("Amount"),
        ui::header_cell("To"),
        ui::header_cell("Result"),
    ]);

    for record in records {
        table.add_row(vec![
            Cell::new(record.timestamp().format("%Y-%m-%d %H:%M:%S")),
            Cell::new(record.from()),
            ui::amount_cell(record.amount(), 2),
            Cell::new(record.to()),
            ui::amount_cell(record.converted(), 2),
        ]);
    }

    let mut output = format!(
        "{}\n\n",
        ui::style_text("Conversion History", ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\n{} {}",
        ui::style_text("Total conversions:", ui::StyleType::TotalLabel),
        ui::style_text(&records.len().to_string(), ui::StyleType::TotalValue)
    ));
    output
}

pub async fn show(history: &HistoryStore) -> Result<()> {
    let records = history.records().await;
    println!("{}", display_as_table(&records));
    Ok(())
}

pub async fn export(history: &HistoryStore, path: &Path) -> Result<()> {
    let rows = history
        .export_tabular(path)
        .await
        .with_context(|| format!("Failed to export history to {}", path.display()))?;
    println!("Exported {rows} conversions to {}", path.display());
    Ok(())
}

pub async fn clear(history: &HistoryStore) -> Result<()> {
    history
        .clear()
        .await
        .context("History cleared in memory only; failed to persist the empty snapshot")?;
    println!("History cleared");
    Ok(())
}
