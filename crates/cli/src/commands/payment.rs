//! Payment status lookup.

use florist_storefront::api::{ApiClient, TokenStore};
use florist_storefront::config::ApiConfig;

use super::CliError;

/// Print the payment state of a hosted checkout session.
///
/// # Errors
///
/// Returns an error if the API is misconfigured, unreachable or does not
/// know the session.
pub async fn status(session_id: &str) -> Result<(), CliError> {
    let config = ApiConfig::from_env()?;
    let client = ApiClient::new(&config)?;

    let status = client
        .payment_status(session_id, &TokenStore::anonymous())
        .await?;

    #[allow(clippy::print_stdout)]
    {
        println!("session:      {session_id}");
        println!("payment:      {:?}", status.status);
        if let Some(order_id) = status.order_id {
            println!("order:        #{order_id}");
        }
        if let Some(order_status) = status.order_status {
            println!("order status: {}", order_status.label());
        }
        println!(
            "result:       {}",
            if status.status.is_paid() { "paid" } else { "not paid" }
        );
    }

    Ok(())
}
