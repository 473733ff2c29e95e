//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID
//! 4. Security headers
//! 5. Session layer (tower-sessions, `PostgreSQL` store)
//! 6. API session (per-request token store, refresh write-back, expiry redirect)
//! 7. Rate limiting on sign-in/sign-up POSTs (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{
    ApiTokens, SESSION_COOKIE_NAME, api_session_middleware, create_session_layer, session_layer,
};
