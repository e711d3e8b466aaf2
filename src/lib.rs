pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::store::HistoryStore;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Convert {
        from: String,
        amount: f64,
        to: Vec<String>,
    },
    History,
    Export {
        path: PathBuf,
    },
    Clear,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Currency converter starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(
        base_url = %config.api.base_url,
        timeout_ms = config.api.timeout_ms,
        max_attempts = config.api.max_attempts,
        auto_save = config.history.auto_save,
        "Loaded config"
    );

    let history = Arc::new(
        HistoryStore::open(config.history_path()?, config.history.auto_save).await,
    );
    debug!(path = %history.path().display(), "Using history snapshot");

    match command {
        AppCommand::Convert { from, amount, to } => {
            cli::convert::run(&config, history, &from, amount, &to).await
        }
        AppCommand::History => cli::history::show(&history).await,
        AppCommand::Export { path } => cli::history::export(&history, &path).await,
        AppCommand::Clear => cli::history::clear(&history).await,
    }
}
