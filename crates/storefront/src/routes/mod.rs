//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (session database)
//!
//! # Catalog
//! GET  /                       - Catalog, alerts via ?error=code
//! GET  /flowers/{id}           - Flower detail
//! POST /favorites/toggle       - Toggle a favorite
//!
//! # Cart
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add a flower, back to redirect_to
//! POST /cart/update            - Set a line's quantity
//! POST /cart/remove            - Remove a line
//! POST /cart/clear             - Empty the cart
//!
//! # Order (requires auth)
//! GET  /order                  - Checkout form
//! POST /order                  - Place the order without payment
//! POST /order/pay              - Redirect to the hosted payment page
//!
//! # Payment return
//! GET  /order-success          - Payment result (?session_id=...)
//! GET  /order-cancel           - Payment cancelled
//!
//! # Profile (requires auth)
//! GET  /profile                             - Orders and favorites (?tab=...)
//! POST /profile/orders/{id}/reorder         - Copy an order into the cart
//! POST /profile/orders/{id}/pay             - Pay a pending order
//! POST /profile/favorites/{id}/remove       - Remove a favorite
//!
//! # Auth
//! GET  /login, POST /login     - Sign in (POST rate limited)
//! GET  /register, POST /register - Sign up (POST rate limited)
//! POST /logout                 - Sign out
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod favorites;
pub mod order;
pub mod payment;
pub mod profile;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::api::User;
use crate::middleware::auth_rate_limiter;
use crate::models::session;
use crate::state::AppState;

// =============================================================================
// Shared page data
// =============================================================================

/// Header data every page renders: the cart badge and the sign-in state.
#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub cart_count: u32,
    pub user: Option<User>,
}

impl Nav {
    /// Read the header data from the session.
    pub async fn load(session: &Session) -> Self {
        let cart = session::load_cart(session).await;
        let user = if session::has_access_token(session).await {
            session::current_user(session).await
        } else {
            None
        };

        Self {
            cart_count: cart.item_count(),
            user,
        }
    }

    #[must_use]
    pub const fn signed_in(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        self.user.as_ref().map_or("", User::display_name)
    }
}

/// Query parameter carrying an alert code across a redirect.
#[derive(Debug, Default, Deserialize)]
pub struct AlertQuery {
    pub error: Option<String>,
}

impl AlertQuery {
    /// The message for the carried code, if it is a known one.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.error
            .as_deref()
            .and_then(alert_message)
            .map(String::from)
    }
}

/// Human message for an alert code.
#[must_use]
pub fn alert_message(code: &str) -> Option<&'static str> {
    match code {
        "empty_cart" => Some("Your cart is empty. Add some flowers before placing an order."),
        "login_required" => Some("Sign in to add flowers to your favorites."),
        "session_expired" => Some("Your session has expired. Please sign in again."),
        "favorite_failed" => Some("Could not update your favorites. Please try again."),
        "flower_unavailable" => Some("That flower is no longer available."),
        "missing_contact" => {
            Some("The order is missing contact details. Please place a new order.")
        }
        _ => None,
    }
}

/// Accept only local paths as a post-action redirect target.
pub(crate) fn local_redirect(target: Option<&str>, fallback: &'static str) -> String {
    match target {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => fallback.to_string(),
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::index))
        .route("/flowers/{id}", get(catalog::show))
        .route("/favorites/toggle", post(favorites::toggle))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/order", get(order::form).post(order::place))
        .route("/order/pay", post(order::pay))
        .route("/order-success", get(payment::success))
        .route("/order-cancel", get(payment::cancel))
}

/// Create the profile routes router.
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(profile::show))
        .route("/orders/{id}/reorder", post(profile::reorder))
        .route("/orders/{id}/pay", post(profile::pay))
        .route("/favorites/{id}/remove", post(profile::remove_favorite))
}

/// Create the auth routes router.
///
/// Only the form submissions are rate limited.
pub fn auth_routes() -> Router<AppState> {
    let submissions = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/logout", post(auth::logout))
        .merge(submissions)
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .merge(order_routes())
        .nest("/profile", profile_routes())
        .merge(auth_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_alert_codes() {
        assert!(alert_message("empty_cart").is_some());
        assert!(alert_message("session_expired").is_some());
        assert_eq!(alert_message("<script>"), None);
    }

    #[test]
    fn test_alert_query_ignores_unknown_codes() {
        let query = AlertQuery {
            error: Some("whatever".to_string()),
        };
        assert_eq!(query.message(), None);
    }

    #[test]
    fn test_local_redirect_rejects_other_hosts() {
        assert_eq!(local_redirect(Some("/cart"), "/"), "/cart");
        assert_eq!(local_redirect(Some("//evil.example"), "/"), "/");
        assert_eq!(local_redirect(Some("https://evil.example"), "/"), "/");
        assert_eq!(local_redirect(None, "/cart"), "/cart");
    }
}
