//! Session store migration.
//!
//! The storefront keeps visitor sessions (tokens, user, cart) in
//! `PostgreSQL` through `tower-sessions-sqlx-store`. This command creates
//! the store's schema and table; it is safe to run repeatedly.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use florist_storefront::{config, db};
use tower_sessions_sqlx_store::PostgresStore;

use super::CliError;

/// Run the session store migration.
///
/// # Errors
///
/// Returns an error if the database URL is missing or the migration fails.
pub async fn run() -> Result<(), CliError> {
    let database_url = config::database_url_from_env()?;

    tracing::info!("Connecting to session database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running session store migration...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Session store migration complete!");
    Ok(())
}
