//! Catalog inspection.

use florist_core::Flower;
use florist_storefront::api::{ApiClient, TokenStore};
use florist_storefront::config::ApiConfig;

use super::CliError;

/// One line per flower: id, stock flag, price, name.
fn format_row(flower: &Flower) -> String {
    let stock = if flower.in_stock { " " } else { "x" };
    let category = flower
        .category
        .as_ref()
        .map_or(String::new(), |c| format!(" [{}]", c.name));
    format!(
        "{:>5} {stock} {:>12}  {}{category}",
        flower.id, flower.price.to_string(), flower.name
    )
}

/// Print every flower in the catalog.
///
/// # Errors
///
/// Returns an error if the API is misconfigured or unreachable.
pub async fn list() -> Result<(), CliError> {
    let config = ApiConfig::from_env()?;
    let client = ApiClient::new(&config)?;

    tracing::info!(api = client.base_url(), "Fetching catalog");
    let flowers = client.list_flowers(&TokenStore::anonymous()).await?;

    #[allow(clippy::print_stdout)]
    {
        for flower in &flowers {
            println!("{}", format_row(flower));
        }
        println!("{} flowers", flowers.len());
    }

    Ok(())
}
