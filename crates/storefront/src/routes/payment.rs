//! Return pages of the hosted checkout.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::middleware::ApiTokens;
use crate::routes::Nav;
use crate::state::AppState;

/// Query parameters appended by the payment provider.
#[derive(Debug, Deserialize)]
pub struct PaymentReturnQuery {
    pub session_id: Option<String>,
}

/// Payment result template.
#[derive(Template, WebTemplate)]
#[template(path = "order/payment_result.html")]
pub struct PaymentResultTemplate {
    pub nav: Nav,
    pub paid: bool,
}

/// Payment cancelled template.
#[derive(Template, WebTemplate)]
#[template(path = "order/cancel.html")]
pub struct PaymentCancelTemplate {
    pub nav: Nav,
}

/// Check the payment once and show the outcome.
///
/// Only a `paid` status counts as success. A missing session id or a failed
/// status call shows the error view.
#[instrument(skip(state, session, tokens, query))]
pub async fn success(
    State(state): State<AppState>,
    session: Session,
    ApiTokens(tokens): ApiTokens,
    Query(query): Query<PaymentReturnQuery>,
) -> PaymentResultTemplate {
    let paid = match query.session_id.as_deref().filter(|id| !id.is_empty()) {
        Some(session_id) => match state.api().payment_status(session_id, &tokens).await {
            Ok(status) => {
                tracing::info!(status = ?status.status, order_id = ?status.order_id, "Payment status checked");
                status.status.is_paid()
            }
            Err(e) => {
                tracing::warn!("Payment status check failed: {e}");
                false
            }
        },
        None => {
            tracing::warn!("Payment return without session id");
            false
        }
    };

    PaymentResultTemplate {
        nav: Nav::load(&session).await,
        paid,
    }
}

/// The visitor abandoned the hosted checkout.
pub async fn cancel(session: Session) -> PaymentCancelTemplate {
    PaymentCancelTemplate {
        nav: Nav::load(&session).await,
    }
}
