//! Authentication route handlers.
//!
//! Sign-in and sign-up exchange credentials with the flower API for a token
//! pair, which is stored in the session together with the user.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::{ApiError, AuthResponse, LoginRequest, RegisterRequest};
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::models::session;
use crate::routes::{AlertQuery, Nav};
use crate::state::AppState;

const LOGIN_FAILED: &str = "Sign-in failed. Check your username and password.";
const REGISTER_FAILED: &str = "Registration failed. Check your details.";
const API_UNREACHABLE: &str = "Could not reach the flower shop. Please try again later.";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password2: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub error: Option<String>,
    pub username: String,
}

/// Registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub nav: Nav,
    pub error: Option<String>,
    pub form: RegisterForm,
}

// =============================================================================
// Helpers
// =============================================================================

/// Store a fresh sign-in and reset everything cached for the user.
async fn sign_in(state: &AppState, session: &Session, auth: &AuthResponse) -> Result<()> {
    session::store_sign_in(session, auth).await?;
    state.favorites().invalidate(auth.user.id).await;
    set_sentry_user(&auth.user.id, Some(&auth.user.email));
    tracing::info!(user_id = %auth.user.id, "Signed in");
    Ok(())
}

fn login_error(err: &ApiError) -> String {
    match err {
        ApiError::Status { .. } => err
            .user_message(&["error", "detail"])
            .unwrap_or_else(|| LOGIN_FAILED.to_string()),
        ApiError::Http(_) => API_UNREACHABLE.to_string(),
        _ => LOGIN_FAILED.to_string(),
    }
}

/// All validation messages of a failed registration on one line.
fn register_error(err: &ApiError) -> String {
    match err {
        ApiError::Status { .. } => {
            let fields = err.field_errors();
            if fields.is_empty() {
                REGISTER_FAILED.to_string()
            } else {
                fields.join(", ")
            }
        }
        ApiError::Http(_) => API_UNREACHABLE.to_string(),
        _ => REGISTER_FAILED.to_string(),
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display login page.
#[instrument(skip_all)]
pub async fn login_page(session: Session, Query(query): Query<AlertQuery>) -> LoginTemplate {
    LoginTemplate {
        nav: Nav::load(&session).await,
        error: query.message(),
        username: String::new(),
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return Ok(LoginTemplate {
            nav: Nav::load(&session).await,
            error: Some("Enter your username and password.".to_string()),
            username: username.to_string(),
        }
        .into_response());
    }

    let request = LoginRequest {
        username,
        password: &form.password,
    };

    match state.api().login(&request).await {
        Ok(auth) => {
            sign_in(&state, &session, &auth).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            tracing::warn!("Login failed: {e}");
            Ok(LoginTemplate {
                nav: Nav::load(&session).await,
                error: Some(login_error(&e)),
                username: username.to_string(),
            }
            .into_response())
        }
    }
}

/// Display registration page.
#[instrument(skip_all)]
pub async fn register_page(session: Session) -> RegisterTemplate {
    RegisterTemplate {
        nav: Nav::load(&session).await,
        error: None,
        form: RegisterForm::default(),
    }
}

/// Handle registration form submission.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let request = RegisterRequest {
        username: form.username.trim(),
        email: form.email.trim(),
        first_name: form.first_name.trim(),
        last_name: form.last_name.trim(),
        password: &form.password,
        password2: &form.password2,
        phone: form.phone.trim(),
    };

    let result = state.api().register(&request).await;
    match result {
        Ok(auth) => {
            sign_in(&state, &session, &auth).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) => {
            tracing::warn!("Registration failed: {e}");
            Ok(RegisterTemplate {
                nav: Nav::load(&session).await,
                error: Some(register_error(&e)),
                form: RegisterForm {
                    password: String::new(),
                    password2: String::new(),
                    ..form
                },
            }
            .into_response())
        }
    }
}

/// Handle logout.
///
/// Removes the tokens and the user; the cart stays.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect> {
    if let Some(user) = session::current_user(&session).await {
        state.favorites().invalidate(user.id).await;
    }
    session::clear_sign_in(&session).await?;
    clear_sentry_user();

    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, body: &str) -> ApiError {
        ApiError::Status {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_login_error_prefers_server_message() {
        let err = status(401, r#"{"error": "Invalid credentials"}"#);
        assert_eq!(login_error(&err), "Invalid credentials");
    }

    #[test]
    fn test_login_error_falls_back() {
        assert_eq!(login_error(&status(401, "")), LOGIN_FAILED);
    }

    #[test]
    fn test_register_error_joins_field_messages() {
        let err = status(
            400,
            r#"{"username": ["A user with that username already exists."]}"#,
        );
        assert_eq!(
            register_error(&err),
            "username: A user with that username already exists."
        );
    }

    #[test]
    fn test_register_error_without_fields() {
        assert_eq!(register_error(&status(500, "oops")), REGISTER_FAILED);
    }
}
