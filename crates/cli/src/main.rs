//! Emporium CLI - database, fixture, rate and token management.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending database migrations
//! emp-cli migrate
//!
//! # Fill an empty database with development fixtures
//! emp-cli seed --products 24
//!
//! # Check database, storage and rate coverage
//! emp-cli diagnose
//!
//! # Fetch and store fresh exchange rates
//! emp-cli rates refresh
//!
//! # Issue a bearer token
//! emp-cli token issue --role manager --days 30
//!
//! # Check a running server
//! emp-cli smoke --base-url http://localhost:8000 --token "$EMPORIUM_TOKEN"
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use secrecy::SecretString;

mod commands;

#[derive(Parser)]
#[command(name = "emp-cli")]
#[command(author, version, about = "Emporium CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed an empty database with fixtures
    Seed {
        /// Number of products to create
        #[arg(short, long, default_value_t = 12)]
        products: usize,
    },
    /// Check that configured dependencies are reachable
    Diagnose,
    /// Manage exchange rates
    Rates {
        #[command(subcommand)]
        action: RatesAction,
    },
    /// Manage bearer tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Run smoke checks against a running server
    Smoke {
        /// Server base URL
        #[arg(short, long, default_value = "http://localhost:8000")]
        base_url: String,

        /// Bearer token enabling write checks
        #[arg(short, long, env = "EMPORIUM_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
}

#[derive(Subcommand)]
enum RatesAction {
    /// Fetch rates from the configured source and store them
    Refresh,
}

#[derive(Subcommand)]
enum TokenAction {
    /// Issue a signed token
    Issue {
        /// Role (`viewer`, `editor`, `manager`, `staff`)
        #[arg(short, long, default_value = "editor")]
        role: String,

        /// Lifetime in days
        #[arg(short, long, default_value_t = 30)]
        days: u32,
    },
}

#[tokio::main]
async fn main() {
    // Defaults to info for the CLI and the API library it drives
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "emporium_cli=info,emporium_api=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { products } => {
            let summary = commands::seed::run(products).await?;
            tracing::info!(
                tax_classes = summary.tax_classes,
                categories = summary.categories,
                lookups = summary.lookups,
                products = summary.products,
                "Seed complete"
            );
        }
        Commands::Diagnose => {
            commands::diagnose::run().await?;
        }
        Commands::Rates { action } => match action {
            RatesAction::Refresh => {
                commands::rates::refresh().await?;
            }
        },
        Commands::Token { action } => match action {
            TokenAction::Issue { role, days } => commands::token::issue(&role, days)?,
        },
        Commands::Smoke { base_url, token } => {
            commands::smoke::run(&base_url, token.map(SecretString::from)).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_seed_count() {
        let cli = Cli::try_parse_from(["emp-cli", "seed", "--products", "3"]).ok();
        assert!(matches!(
            cli.map(|c| c.command),
            Some(Commands::Seed { products: 3 })
        ));
    }
}
