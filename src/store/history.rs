use crate::core::conversion::ConversionRecord;
use crate::core::error::HistoryError;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const CSV_HEADER: &str = "ID,Date,Time,From,Amount,To,Converted,Rate";

/// Ordered log of conversions backed by a JSON snapshot file.
///
/// The snapshot is always rewritten in full. Appends and their autosave run
/// under one lock, so concurrent writers never lose a record.
pub struct HistoryStore {
    path: PathBuf,
    auto_save: bool,
    records: Mutex<Vec<ConversionRecord>>,
}

impl HistoryStore {
    pub async fn open(path: impl Into<PathBuf>, auto_save: bool) -> Self {
        let path = path.into();
        let records = load(&path).await;
        if !records.is_empty() {
            info!(count = records.len(), path = %path.display(), "Loaded history");
        }

        Self {
            path,
            auto_save,
            records: Mutex::new(records),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn records(&self) -> Vec<ConversionRecord> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Adds a record, persisting the whole sequence when autosave is on.
    ///
    /// A failed autosave is logged; the record stays in memory.
    pub async fn append(&self, record: ConversionRecord) {
        let mut records = self.records.lock().await;
        records.push(record);
        debug!(count = records.len(), "Appended conversion to history");

        if self.auto_save {
            if let Err(e) = write_snapshot(&self.path, &records).await {
                warn!(error = %e, "Failed to autosave history");
            }
        }
    }

    pub async fn save(&self) -> Result<(), HistoryError> {
        let records = self.records.lock().await;
        write_snapshot(&self.path, &records).await
    }

    /// Empties the history and persists the empty snapshot.
    pub async fn clear(&self) -> Result<(), HistoryError> {
        let mut records = self.records.lock().await;
        records.clear();
        info!("History cleared");
        write_snapshot(&self.path, &records).await
    }

    /// Writes the history as CSV and returns the number of rows written.
    pub async fn export_tabular(&self, path: &Path) -> Result<usize, HistoryError> {
        let records = self.records.lock().await;
        let csv = to_csv(&records);
        tokio::fs::write(path, csv)
            .await
            .map_err(|source| HistoryError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        info!(rows = records.len(), path = %path.display(), "Exported history");
        Ok(records.len())
    }
}

/// Reads a snapshot. Missing or unreadable snapshots yield an empty history;
/// a single unreadable record is skipped and the rest are kept.
pub async fn load(path: &Path) -> Vec<ConversionRecord> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "No history snapshot yet");
            return Vec::new();
        }
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Failed to read history");
            return Vec::new();
        }
    };

    let entries: Vec<serde_json::Value> = match serde_json::from_str(&text) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Ignoring corrupt history snapshot");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<ConversionRecord>(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(index, error = %e, path = %path.display(), "Skipping unreadable history record");
                None
            }
        })
        .collect()
}

async fn write_snapshot(path: &Path, records: &[ConversionRecord]) -> Result<(), HistoryError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| HistoryError::Io { path, source }
    };

    let json = serde_json::to_string_pretty(records)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(io_err(parent))?;
    }

    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, json).await.map_err(io_err(&tmp))?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err(path))?;
    debug!(count = records.len(), path = %path.display(), "Saved history");
    Ok(())
}

fn to_csv(records: &[ConversionRecord]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + records.len() * 96);
    out.push_str(CSV_HEADER);
    out.push('\n');

    for r in records {
        let ts = r.timestamp();
        out.push_str(&format!(
            "{},{},{},{},{:.2},{},{:.2},{:.6}\n",
            r.id(),
            ts.format("%Y-%m-%d"),
            ts.format("%H:%M:%S"),
            r.from(),
            r.amount(),
            r.to(),
            r.converted(),
            r.rate(),
        ));
    }
    out
}
