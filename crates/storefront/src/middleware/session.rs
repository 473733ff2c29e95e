//! Session layer and the per-request token store.
//!
//! Sessions are `PostgreSQL`-backed via tower-sessions. On top of the session
//! layer, [`api_session_middleware`] hands every request a [`TokenStore`]
//! seeded from the session, then reconciles the session with whatever the
//! API client did to the tokens:
//!
//! - refreshed tokens are written back
//! - an expired store clears the sign-in keys and sends the visitor to `/login`

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::api::{TokenState, TokenStore};
use crate::config::StorefrontConfig;
use crate::error::clear_sentry_user;
use crate::models::session;
use crate::state::AppState;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "florist_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// The sessions table must exist; create it with `florist-cli migrate`.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    session_layer(PostgresStore::new(pool.clone()), config.is_https())
}

/// Session layer over any store, with the storefront's cookie settings.
#[must_use]
pub fn session_layer<S: SessionStore>(store: S, secure: bool) -> SessionManagerLayer<S> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Extractor for the request's [`TokenStore`].
///
/// Falls back to an anonymous store when the middleware is not installed.
pub struct ApiTokens(pub TokenStore);

impl<S> FromRequestParts<S> for ApiTokens
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<TokenStore>()
                .cloned()
                .unwrap_or_else(TokenStore::anonymous),
        ))
    }
}

/// Seed a [`TokenStore`] from the session and write its outcome back.
pub async fn api_session_middleware(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let (access, refresh) = session::tokens(&session).await;
    let tokens = TokenStore::new(access, refresh);
    request.extensions_mut().insert(tokens.clone());

    let response = next.run(request).await;

    match tokens.state() {
        TokenState::Unchanged => response,
        TokenState::Refreshed => {
            if let Some(access) = tokens.access_token() {
                let refresh = tokens.refresh_token();
                if let Err(e) = session::store_tokens(
                    &session,
                    access.expose_secret(),
                    refresh.as_ref().map(|r| r.expose_secret()),
                )
                .await
                {
                    tracing::error!("Failed to store refreshed tokens: {e}");
                }
            }
            response
        }
        TokenState::Expired => {
            if let Some(user) = session::current_user(&session).await {
                state.favorites().invalidate(user.id).await;
            }
            if let Err(e) = session::clear_sign_in(&session).await {
                tracing::error!("Failed to clear expired session: {e}");
            }
            clear_sentry_user();
            tracing::info!("Session expired, redirecting to login");
            Redirect::to("/login?error=session_expired").into_response()
        }
    }
}
