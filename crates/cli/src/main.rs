//! Marketplace CLI - database migrations and reconciliation tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! mp-cli migrate
//!
//! # List purchases still pending after an hour
//! mp-cli purchases stale --older-than-minutes 60
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// Used when `RUST_LOG` is unset. Reports are logged at info.
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Parser)]
#[command(name = "mp-cli")]
#[command(author, version, about = "Marketplace CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect purchases
    Purchases {
        #[command(subcommand)]
        action: PurchasesAction,
    },
}

#[derive(Subcommand)]
enum PurchasesAction {
    /// List pending purchases that never completed
    Stale {
        /// Only purchases created at least this many minutes ago
        #[arg(long, default_value_t = 60)]
        older_than_minutes: i64,
    },
}

#[tokio::main]
async fn main() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Purchases { action } => match action {
            PurchasesAction::Stale { older_than_minutes } => {
                commands::purchases::stale(older_than_minutes).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_log_filter_shows_reports() {
        let filter = EnvFilter::new(DEFAULT_LOG_FILTER);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_stale_default_cutoff() {
        let cli = Cli::try_parse_from(["mp-cli", "purchases", "stale"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Purchases {
                action: PurchasesAction::Stale {
                    older_than_minutes: 60
                }
            })
        ));
    }
}
