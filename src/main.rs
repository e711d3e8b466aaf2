use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxconv::cli::convert::{parse_amount, parse_currency_code};
use fxconv::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Convert an amount into one or more currencies
    Convert {
        /// Source currency code, e.g. USD
        #[arg(value_parser = parse_currency_code)]
        from: String,
        /// Amount to convert, greater than zero
        #[arg(value_parser = parse_amount)]
        amount: f64,
        /// Target currency codes, e.g. ARS BRL PEN
        #[arg(required = true, num_args = 1.., value_parser = parse_currency_code)]
        to: Vec<String>,
    },
    /// Display the conversion history
    History,
    /// Export the conversion history as CSV
    Export {
        /// Destination file
        path: PathBuf,
    },
    /// Delete all recorded conversions
    Clear,
}

impl From<Commands> for fxconv::AppCommand {
    fn from(cmd: Commands) -> fxconv::AppCommand {
        match cmd {
            Commands::Convert { from, amount, to } => {
                fxconv::AppCommand::Convert { from, amount, to }
            }
            Commands::History => fxconv::AppCommand::History,
            Commands::Export { path } => fxconv::AppCommand::Export { path },
            Commands::Clear => fxconv::AppCommand::Clear,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxconv::cli::setup::setup(),
        Some(cmd) => fxconv::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
