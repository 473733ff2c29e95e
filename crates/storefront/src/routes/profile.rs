//! Profile route handlers (requires auth).
//!
//! The profile page shows the account details, the order history and the
//! favorites. All three are loaded concurrently over the same token store,
//! so an expired access token costs a single refresh.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use florist_core::{FavoriteId, OrderId};

use crate::api::{Favorite, Order, TokenStore, User};
use crate::checkout::{CheckoutError, SubmitMode, pay_later_request};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{ApiTokens, RequireAuth};
use crate::models::session;
use crate::routes::{Nav, alert_message};
use crate::state::AppState;

/// Query parameters of the profile page.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    pub tab: Option<String>,
    pub error: Option<String>,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile/show.html")]
pub struct ProfileTemplate {
    pub nav: Nav,
    pub user: User,
    pub orders: Vec<Order>,
    pub favorites: Vec<Favorite>,
    pub show_favorites: bool,
    pub alert: Option<String>,
}

async fn render_profile(
    state: &AppState,
    session: &Session,
    tokens: &TokenStore,
    user: User,
    show_favorites: bool,
    mut alert: Option<String>,
) -> ProfileTemplate {
    let api = state.api();
    let (profile, orders, favorites) = tokio::join!(
        api.profile(tokens),
        api.list_orders(tokens),
        state.favorites().get_or_load(user.id, api, tokens),
    );

    let user = profile.unwrap_or_else(|e| {
        tracing::warn!("Failed to load profile, using session copy: {e}");
        user
    });
    let orders = orders.unwrap_or_else(|e| {
        tracing::error!("Failed to load orders: {e}");
        alert.get_or_insert_with(|| "Could not load your orders. Please try again later.".to_string());
        Vec::new()
    });
    let favorites = favorites.map_or_else(
        |e| {
            tracing::warn!("Failed to load favorites: {e}");
            Vec::new()
        },
        |list| list.as_ref().clone(),
    );

    ProfileTemplate {
        nav: Nav::load(session).await,
        user,
        orders,
        favorites,
        show_favorites,
        alert,
    }
}

async fn find_order(state: &AppState, tokens: &TokenStore, id: OrderId) -> Result<Order> {
    state
        .api()
        .list_orders(tokens)
        .await?
        .into_iter()
        .find(|order| order.id == id)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

/// Display the profile page.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    ApiTokens(tokens): ApiTokens,
    Query(query): Query<ProfileQuery>,
) -> ProfileTemplate {
    let show_favorites = query.tab.as_deref() == Some("favorites");
    let alert = query.error.as_deref().and_then(alert_message).map(String::from);

    render_profile(&state, &session, &tokens, user, show_favorites, alert).await
}

/// Put every line of a past order back into the cart.
#[instrument(skip(state, _user, session, tokens))]
pub async fn reorder(
    State(state): State<AppState>,
    _user: RequireAuth,
    session: Session,
    ApiTokens(tokens): ApiTokens,
    Path(id): Path<OrderId>,
) -> Result<Redirect> {
    let order = find_order(&state, &tokens, id).await?;

    let mut cart = session::load_cart(&session).await;
    for line in order.items {
        cart.add_quantity(line.flower, line.quantity);
    }
    session::save_cart(&session, &cart).await?;

    let order_id = id.to_string();
    add_breadcrumb("cart", "Re-ordered", Some(&[("order_id", &order_id)]));

    Ok(Redirect::to("/cart"))
}

/// Open a hosted checkout for a pending order.
#[instrument(skip(state, user, session, tokens), fields(user_id = %user.id))]
pub async fn pay(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    ApiTokens(tokens): ApiTokens,
    Path(id): Path<OrderId>,
) -> Result<Response> {
    let order = find_order(&state, &tokens, id).await?;
    if !order.status.is_payable() {
        return Err(AppError::BadRequest(format!(
            "order {id} is {}",
            order.status.as_str()
        )));
    }

    let request = match pay_later_request(&order, &user) {
        Ok(request) => request,
        Err(CheckoutError::MissingContact) => {
            return Ok(Redirect::to("/profile?error=missing_contact").into_response());
        }
        Err(e) => return Err(AppError::BadRequest(e.to_string())),
    };

    let order_id = id.to_string();
    add_breadcrumb("checkout", "Paying pending order", Some(&[("order_id", &order_id)]));

    match state.api().create_checkout(&request, &tokens).await {
        Ok(checkout) => Ok(Redirect::to(&checkout.checkout_url).into_response()),
        Err(e) => {
            tracing::warn!("Failed to create checkout for order {id}: {e}");
            let alert = SubmitMode::PayOnline.failure_message(&e);
            Ok(render_profile(&state, &session, &tokens, user, false, Some(alert))
                .await
                .into_response())
        }
    }
}

/// Remove a favorite from the favorites tab.
#[instrument(skip(state, user, tokens), fields(user_id = %user.id))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiTokens(tokens): ApiTokens,
    Path(id): Path<FavoriteId>,
) -> Redirect {
    if let Err(e) = state
        .favorites()
        .remove(user.id, id, state.api(), &tokens)
        .await
    {
        tracing::warn!("Failed to remove favorite {id}: {e}");
        return Redirect::to("/profile?tab=favorites&error=favorite_failed");
    }

    Redirect::to("/profile?tab=favorites")
}
