//! CLI command implementations.

pub mod catalog;
pub mod migrate;
pub mod payment;

use florist_storefront::api::ApiError;
use florist_storefront::config::ConfigError;
use thiserror::Error;

/// Errors a command can end with.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Flower API error: {0}")]
    Api(#[from] ApiError),
}
