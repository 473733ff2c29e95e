//! Visitor state kept in the session.
//!
//! The session holds what a browser client would keep in local storage: the
//! token pair and the signed-in user. The cart lives next to them.

use tower_sessions::Session;

use florist_core::Cart;

use crate::api::{AuthResponse, User};

/// Session keys for visitor data.
pub mod keys {
    /// Bearer access token for the flower API.
    pub const ACCESS_TOKEN: &str = "accessToken";

    /// Refresh token used to obtain a new access token.
    pub const REFRESH_TOKEN: &str = "refreshToken";

    /// The signed-in user's profile.
    pub const USER: &str = "user";

    /// The visitor's cart.
    pub const CART: &str = "cart";
}

/// Load the cart, treating a missing or unreadable entry as empty.
pub async fn load_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Persist the cart.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CART, cart).await
}

/// The signed-in user, if any.
pub async fn current_user(session: &Session) -> Option<User> {
    session.get::<User>(keys::USER).await.ok().flatten()
}

/// The stored token pair.
pub async fn tokens(session: &Session) -> (Option<String>, Option<String>) {
    let access = session
        .get::<String>(keys::ACCESS_TOKEN)
        .await
        .ok()
        .flatten();
    let refresh = session
        .get::<String>(keys::REFRESH_TOKEN)
        .await
        .ok()
        .flatten();
    (access, refresh)
}

/// Whether an access token is stored.
pub async fn has_access_token(session: &Session) -> bool {
    tokens(session).await.0.is_some_and(|t| !t.is_empty())
}

/// Store the tokens and user returned by login or registration.
///
/// The session id is cycled to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn store_sign_in(
    session: &Session,
    auth: &AuthResponse,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::ACCESS_TOKEN, &auth.tokens.access).await?;
    session
        .insert(keys::REFRESH_TOKEN, &auth.tokens.refresh)
        .await?;
    session.insert(keys::USER, &auth.user).await
}

/// Store tokens obtained by a refresh.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn store_tokens(
    session: &Session,
    access: &str,
    refresh: Option<&str>,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::ACCESS_TOKEN, access).await?;
    if let Some(refresh) = refresh {
        session.insert(keys::REFRESH_TOKEN, refresh).await?;
    }
    Ok(())
}

/// Remove the three sign-in keys. The cart is kept.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_sign_in(session: &Session) -> Result<(), tower_sessions::session::Error> {
    for key in [keys::ACCESS_TOKEN, keys::REFRESH_TOKEN, keys::USER] {
        session.remove_value(key).await?;
    }
    Ok(())
}
