//! Order form and submission handlers.
//!
//! Both submit buttons post the same form; the path decides between placing
//! the order directly and paying online through the hosted checkout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use florist_core::{Cart, OrderId};

use crate::api::{TokenStore, User};
use crate::checkout::{
    CheckoutError, CheckoutForm, CheckoutOutcome, CheckoutPhase, FieldErrors,
    ORDER_REDIRECT_SECONDS, SubmitMode,
};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{ApiTokens, RequireAuth};
use crate::models::session;
use crate::routes::Nav;
use crate::state::AppState;

/// Order form template.
#[derive(Template, WebTemplate)]
#[template(path = "order/form.html")]
pub struct OrderFormTemplate {
    pub nav: Nav,
    pub cart: Cart,
    pub form: CheckoutForm,
    pub errors: FieldErrors,
    pub alert: Option<String>,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "order/placed.html")]
pub struct OrderPlacedTemplate {
    pub nav: Nav,
    pub order_id: OrderId,
    pub redirect_seconds: u64,
}

/// Contact details known from the profile.
fn prefilled(user: &User) -> CheckoutForm {
    CheckoutForm {
        name: user.display_name().to_string(),
        phone: user.phone().unwrap_or_default().to_string(),
        email: user.email.clone(),
        ..CheckoutForm::default()
    }
}

/// Display the order form.
#[instrument(skip_all)]
pub async fn form(RequireAuth(user): RequireAuth, session: Session) -> Response {
    let cart = session::load_cart(&session).await;
    if cart.is_empty() {
        return Redirect::to("/?error=empty_cart").into_response();
    }

    OrderFormTemplate {
        nav: Nav::load(&session).await,
        cart,
        form: prefilled(&user),
        errors: FieldErrors::default(),
        alert: None,
    }
    .into_response()
}

/// Place the order without online payment.
#[instrument(skip_all)]
pub async fn place(
    State(state): State<AppState>,
    _user: RequireAuth,
    session: Session,
    ApiTokens(tokens): ApiTokens,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    run_checkout(&state, &session, &tokens, form, SubmitMode::Direct).await
}

/// Create a hosted checkout session and send the visitor to it.
#[instrument(skip_all)]
pub async fn pay(
    State(state): State<AppState>,
    _user: RequireAuth,
    session: Session,
    ApiTokens(tokens): ApiTokens,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    run_checkout(&state, &session, &tokens, form, SubmitMode::PayOnline).await
}

async fn run_checkout(
    state: &AppState,
    session: &Session,
    tokens: &TokenStore,
    form: CheckoutForm,
    mode: SubmitMode,
) -> Result<Response> {
    let mut cart = session::load_cart(session).await;

    let phase = match CheckoutPhase::begin(&cart, form, mode) {
        Ok(phase) => phase,
        Err(CheckoutError::EmptyCart) => {
            return Ok(Redirect::to("/?error=empty_cart").into_response());
        }
        Err(e) => return Err(AppError::BadRequest(e.to_string())),
    };

    if matches!(phase, CheckoutPhase::Submitting { .. }) {
        add_breadcrumb(
            "checkout",
            match mode {
                SubmitMode::Direct => "Placing order",
                SubmitMode::PayOnline => "Starting online payment",
            },
            None,
        );
    }

    match phase.submit(state.api(), tokens).await.recover() {
        CheckoutPhase::Succeeded(CheckoutOutcome::Placed { order_id }) => {
            cart.clear();
            session::save_cart(session, &cart).await?;
            tracing::info!(%order_id, "Order placed");

            Ok(OrderPlacedTemplate {
                nav: Nav::load(session).await,
                order_id,
                redirect_seconds: ORDER_REDIRECT_SECONDS,
            }
            .into_response())
        }
        CheckoutPhase::Succeeded(CheckoutOutcome::Redirect { checkout_url }) => {
            tracing::info!("Redirecting to hosted checkout");
            Ok(Redirect::to(&checkout_url).into_response())
        }
        CheckoutPhase::Editing {
            form,
            errors,
            alert,
        } => Ok(OrderFormTemplate {
            nav: Nav::load(session).await,
            cart,
            form,
            errors,
            alert,
        }
        .into_response()),
        CheckoutPhase::Submitting { .. } | CheckoutPhase::Failed { .. } => Err(AppError::Internal(
            "checkout ended in an unsettled phase".to_string(),
        )),
    }
}
