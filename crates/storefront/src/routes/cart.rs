//! Cart route handlers.
//!
//! The cart lives in the visitor's session. Every mutation reloads it,
//! applies one cart operation and stores it back before redirecting, so a
//! reload never repeats the action.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use florist_core::{Cart, FlowerId};

use crate::api::ApiError;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::ApiTokens;
use crate::models::session;
use crate::routes::{Nav, local_redirect};
use crate::state::AppState;

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub flower_id: FlowerId,
    pub redirect_to: Option<String>,
}

/// Update quantity form data.
///
/// The quantity stays a string so that junk input is ignored rather than
/// rejected by the extractor.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub flower_id: FlowerId,
    #[serde(default)]
    pub quantity: String,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub flower_id: FlowerId,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub nav: Nav,
    pub cart: Cart,
}

/// Display cart page.
#[instrument(skip(session))]
pub async fn show(session: Session) -> CartShowTemplate {
    let nav = Nav::load(&session).await;
    let cart = session::load_cart(&session).await;
    CartShowTemplate { nav, cart }
}

/// Add one of a flower to the cart.
///
/// The flower is fetched so that the line carries the current name and price.
#[instrument(skip(state, session, tokens, form), fields(flower_id = %form.flower_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    ApiTokens(tokens): ApiTokens,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let flower = match state.api().get_flower(form.flower_id, &tokens).await {
        Ok(flower) => flower,
        Err(ApiError::NotFound(_)) => {
            return Ok(Redirect::to("/?error=flower_unavailable").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let mut cart = session::load_cart(&session).await;
    cart.add(flower);
    session::save_cart(&session, &cart).await?;

    let flower_id = form.flower_id.to_string();
    add_breadcrumb("cart", "Added flower", Some(&[("flower_id", &flower_id)]));
    tracing::debug!(items = cart.item_count(), "Flower added to cart");

    let back = local_redirect(form.redirect_to.as_deref(), "/");
    Ok(Redirect::to(&back).into_response())
}

/// Set a line's quantity. Zero, negative and non-numeric input is ignored.
#[instrument(skip(session, form), fields(flower_id = %form.flower_id))]
pub async fn update(session: Session, Form(form): Form<UpdateCartForm>) -> Result<Redirect> {
    let Ok(quantity) = form.quantity.trim().parse::<i64>() else {
        tracing::debug!(input = %form.quantity, "Ignoring non-numeric quantity");
        return Ok(Redirect::to("/cart"));
    };

    let mut cart = session::load_cart(&session).await;
    cart.set_quantity(form.flower_id, quantity);
    session::save_cart(&session, &cart).await?;

    Ok(Redirect::to("/cart"))
}

/// Remove a line from the cart.
#[instrument(skip(session, form), fields(flower_id = %form.flower_id))]
pub async fn remove(session: Session, Form(form): Form<RemoveFromCartForm>) -> Result<Redirect> {
    let mut cart = session::load_cart(&session).await;
    cart.remove(form.flower_id);
    session::save_cart(&session, &cart).await?;

    let flower_id = form.flower_id.to_string();
    add_breadcrumb("cart", "Removed flower", Some(&[("flower_id", &flower_id)]));

    Ok(Redirect::to("/cart"))
}

/// Empty the cart.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Redirect> {
    let mut cart = session::load_cart(&session).await;
    cart.clear();
    session::save_cart(&session, &cart).await?;

    add_breadcrumb("cart", "Cleared cart", None);

    Ok(Redirect::to("/cart"))
}
