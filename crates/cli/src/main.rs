//! Florist CLI - operator tools for the storefront.
//!
//! # Usage
//!
//! ```bash
//! # Create or update the session store table
//! florist-cli migrate
//!
//! # List the remote catalog
//! florist-cli catalog list
//!
//! # Look up a hosted checkout session
//! florist-cli payment-status cs_test_a1b2c3
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run the tower-sessions store migration
//! - `catalog list` - Print every flower the API serves
//! - `payment-status` - Print the payment state of a checkout session

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "florist-cli")]
#[command(author, version, about = "Florist storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the session store migration
    Migrate,
    /// Inspect the remote catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Check the payment state of a hosted checkout session
    PaymentStatus {
        /// Checkout session id returned by the payment provider
        session_id: String,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List all flowers
    List,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Catalog { action } => match action {
            CatalogAction::List => commands::catalog::list().await,
        },
        Commands::PaymentStatus { session_id } => commands::payment::status(&session_id).await,
    }
}
