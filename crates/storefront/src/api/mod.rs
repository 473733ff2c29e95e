//! Client for the remote flower API.
//!
//! # Architecture
//!
//! - One `reqwest::Client` shared by all visitors, wrapped in an `Arc`
//! - Visitor credentials are NOT held by the client; every authorised call
//!   takes the request's [`TokenStore`]
//! - No response caching here; pages always see fresh data
//!
//! # Session interceptor
//!
//! Every catalog, order, checkout, profile and favorites call goes through
//! [`ApiClient::send`]:
//!
//! 1. `Authorization: Bearer <access>` is attached only when an access token
//!    is present.
//! 2. A 401 triggers at most one refresh (`POST /auth/token/refresh/`) and
//!    one replay of the original request.
//! 3. A failed refresh, a missing refresh token or a second 401 expires the
//!    token store and yields [`ApiError::SessionExpired`].
//!
//! Login, registration and refresh bypass the interceptor: the API answers
//! bad credentials with 401, which must not be mistaken for an expired
//! session.
//!
//! # Example
//!
//! ```rust,ignore
//! use florist_storefront::api::{ApiClient, TokenStore};
//!
//! let client = ApiClient::new(&config.api)?;
//! let tokens = TokenStore::anonymous();
//! let flowers = client.list_flowers(&tokens).await?;
//! ```

mod tokens;
pub mod types;

pub use tokens::{TokenState, TokenStore};
pub use types::*;

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use florist_core::{FavoriteId, Flower, FlowerId};

use crate::config::ApiConfig;

const REFRESH_PATH: &str = "/auth/token/refresh/";

/// Errors that can occur when talking to the flower API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Non-success status with the raw response body.
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Access could not be restored; the visitor must sign in again.
    #[error("Session expired")]
    SessionExpired,

    /// The configured base URL is unusable.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// First server-provided message found under one of `keys`.
    ///
    /// The API reports business errors as `{"detail": ...}`, `{"message": ...}`
    /// or `{"error": ...}` depending on the endpoint; callers pass the keys in
    /// the order they should be tried.
    #[must_use]
    pub fn user_message(&self, keys: &[&str]) -> Option<String> {
        let Self::Status { body, .. } = self else {
            return None;
        };
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        keys.iter().find_map(|key| match value.get(*key)? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            serde_json::Value::Array(items) => items
                .first()
                .and_then(serde_json::Value::as_str)
                .map(String::from),
            _ => None,
        })
    }

    /// Validation errors flattened to `"field: message"` strings.
    ///
    /// Handles both `{"field": ["msg", ...]}` and `{"field": "msg"}` maps.
    /// Returns an empty list when the body is not a validation map.
    #[must_use]
    pub fn field_errors(&self) -> Vec<String> {
        let Self::Status { body, .. } = self else {
            return Vec::new();
        };
        let Ok(serde_json::Value::Object(map)) = serde_json::from_str(body) else {
            return Vec::new();
        };

        map.iter()
            .flat_map(|(field, value)| {
                let messages: Vec<String> = match value {
                    serde_json::Value::String(s) => vec![s.clone()],
                    serde_json::Value::Array(items) => items
                        .iter()
                        .filter_map(serde_json::Value::as_str)
                        .map(String::from)
                        .collect(),
                    _ => Vec::new(),
                };
                messages
                    .into_iter()
                    .map(move |msg| format!("{field}: {msg}"))
            })
            .collect()
    }

    /// Whether this is the remote API rejecting credentials.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// One outgoing call, kept so it can be replayed after a token refresh.
#[derive(Debug, Clone)]
struct ApiRequest {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            path: path.into(),
            body: None,
        }
    }

    fn post(path: impl Into<String>, body: &impl Serialize) -> Result<Self, ApiError> {
        Ok(Self {
            method: Method::POST,
            path: path.into(),
            body: Some(serde_json::to_value(body)?),
        })
    }
}

/// Client for the flower API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the HTTP client
    /// cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base = Url::parse(&config.base_url)?;
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: base.as_str().trim_end_matches('/').to_string(),
            }),
        })
    }

    /// The base URL all paths are appended to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// List the whole catalog.
    #[instrument(skip(self, tokens))]
    pub async fn list_flowers(&self, tokens: &TokenStore) -> Result<Vec<Flower>, ApiError> {
        self.send_json(&ApiRequest::get("/flowers/"), tokens).await
    }

    /// Fetch one flower.
    #[instrument(skip(self, tokens), fields(flower_id = %id))]
    pub async fn get_flower(&self, id: FlowerId, tokens: &TokenStore) -> Result<Flower, ApiError> {
        self.send_json(&ApiRequest::get(format!("/flowers/{id}/")), tokens)
            .await
    }

    // =========================================================================
    // Orders and payments
    // =========================================================================

    /// Place an order without online payment.
    #[instrument(skip(self, order, tokens), fields(items = order.items.len()))]
    pub async fn create_order(
        &self,
        order: &OrderRequest,
        tokens: &TokenStore,
    ) -> Result<Order, ApiError> {
        self.send_json(&ApiRequest::post("/orders/", order)?, tokens)
            .await
    }

    /// The signed-in user's orders.
    #[instrument(skip(self, tokens))]
    pub async fn list_orders(&self, tokens: &TokenStore) -> Result<Vec<Order>, ApiError> {
        self.send_json(&ApiRequest::get("/orders/"), tokens).await
    }

    /// Create a hosted checkout session for an order.
    #[instrument(skip(self, order, tokens), fields(items = order.items.len()))]
    pub async fn create_checkout(
        &self,
        order: &OrderRequest,
        tokens: &TokenStore,
    ) -> Result<CheckoutResponse, ApiError> {
        self.send_json(&ApiRequest::post("/checkout/", order)?, tokens)
            .await
    }

    /// Poll the payment state of a hosted checkout session.
    #[instrument(skip(self, tokens))]
    pub async fn payment_status(
        &self,
        session_id: &str,
        tokens: &TokenStore,
    ) -> Result<PaymentStatusResponse, ApiError> {
        let path = format!("/payment-status/{}/", urlencoding::encode(session_id));
        self.send_json(&ApiRequest::get(path), tokens).await
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Register a new account. Sent without the session interceptor.
    #[instrument(skip(self, request), fields(username = request.username))]
    pub async fn register(&self, request: &RegisterRequest<'_>) -> Result<AuthResponse, ApiError> {
        let response = self
            .dispatch(&ApiRequest::post("/auth/register/", request)?, None)
            .await?;
        decode(response).await
    }

    /// Exchange credentials for a token pair. Sent without the session interceptor.
    #[instrument(skip(self, request), fields(username = request.username))]
    pub async fn login(&self, request: &LoginRequest<'_>) -> Result<AuthResponse, ApiError> {
        let response = self
            .dispatch(&ApiRequest::post("/auth/login/", request)?, None)
            .await?;
        decode(response).await
    }

    /// The signed-in user's profile.
    #[instrument(skip(self, tokens))]
    pub async fn profile(&self, tokens: &TokenStore) -> Result<User, ApiError> {
        self.send_json(&ApiRequest::get("/auth/profile/"), tokens)
            .await
    }

    /// Exchange a refresh token for a new access token.
    #[instrument(skip_all)]
    pub async fn refresh_access(
        &self,
        refresh: &SecretString,
    ) -> Result<RefreshResponse, ApiError> {
        let body = serde_json::json!({ "refresh": refresh.expose_secret() });
        let response = self
            .dispatch(&ApiRequest::post(REFRESH_PATH, &body)?, None)
            .await?;
        decode(response).await
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    #[instrument(skip(self, tokens))]
    pub async fn list_favorites(&self, tokens: &TokenStore) -> Result<Vec<Favorite>, ApiError> {
        self.send_json(&ApiRequest::get("/favorites/"), tokens)
            .await
    }

    #[instrument(skip(self, tokens), fields(flower_id = %flower_id))]
    pub async fn add_favorite(
        &self,
        flower_id: FlowerId,
        tokens: &TokenStore,
    ) -> Result<Favorite, ApiError> {
        let body = AddFavoriteRequest { flower_id };
        self.send_json(&ApiRequest::post("/favorites/", &body)?, tokens)
            .await
    }

    #[instrument(skip(self, tokens), fields(favorite_id = %id))]
    pub async fn remove_favorite(&self, id: FavoriteId, tokens: &TokenStore) -> Result<(), ApiError> {
        let response = self
            .send(&ApiRequest::delete(format!("/favorites/{id}/")), tokens)
            .await?;
        ensure_success(response).await.map(drop)
    }

    // =========================================================================
    // Transport
    // =========================================================================

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        tokens: &TokenStore,
    ) -> Result<T, ApiError> {
        let response = self.send(request, tokens).await?;
        decode(response).await
    }

    /// Send a request through the session interceptor.
    async fn send(
        &self,
        request: &ApiRequest,
        tokens: &TokenStore,
    ) -> Result<reqwest::Response, ApiError> {
        if tokens.is_expired() {
            return Err(ApiError::SessionExpired);
        }

        let sent_with = tokens.access_token();
        let response = self.dispatch(request, sent_with.as_ref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!(path = %request.path, "Access token rejected, refreshing");
        let access = self.refresh_once(tokens, sent_with.as_ref()).await?;

        let retried = self.dispatch(request, Some(&access)).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            tracing::info!(path = %request.path, "Request rejected after token refresh");
            tokens.expire();
            return Err(ApiError::SessionExpired);
        }
        Ok(retried)
    }

    /// Obtain a usable access token after a 401.
    ///
    /// Holds the store's refresh lock so concurrent calls of one request
    /// produce a single refresh.
    async fn refresh_once(
        &self,
        tokens: &TokenStore,
        sent_with: Option<&SecretString>,
    ) -> Result<SecretString, ApiError> {
        let _guard = tokens.refresh_guard().await;

        if tokens.is_expired() {
            return Err(ApiError::SessionExpired);
        }
        if let Some(current) = tokens.rotated_since(sent_with) {
            return Ok(current);
        }

        let Some(refresh) = tokens.refresh_token() else {
            tracing::info!("No refresh token, session expired");
            tokens.expire();
            return Err(ApiError::SessionExpired);
        };

        match self.refresh_access(&refresh).await {
            Ok(refreshed) => {
                let access = SecretString::from(refreshed.access);
                tokens.store_refreshed(access.clone(), refreshed.refresh.map(SecretString::from));
                tracing::debug!("Access token refreshed");
                Ok(access)
            }
            Err(e) => {
                tracing::info!(error = %e, "Token refresh failed, session expired");
                tokens.expire();
                Err(ApiError::SessionExpired)
            }
        }
    }

    /// Send a single HTTP request, no retries.
    async fn dispatch(
        &self,
        request: &ApiRequest,
        access: Option<&SecretString>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.inner.base_url, request.path);
        let mut builder = self.inner.client.request(request.method.clone(), url);

        if let Some(token) = access {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }
}

/// Map non-success responses to [`ApiError`], passing successes through.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let path = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();

    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(path));
    }

    if status.is_server_error() {
        tracing::error!(
            status = %status,
            path = %path,
            body = %body.chars().take(500).collect::<String>(),
            "Flower API returned server error"
        );
    } else {
        tracing::debug!(status = %status, path = %path, "Flower API rejected request");
    }

    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let response = ensure_success(response).await?;
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "Failed to parse flower API response"
        );
        ApiError::Parse(e)
    })
}
