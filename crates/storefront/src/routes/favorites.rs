//! Favorite toggle handler.

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use florist_core::FlowerId;

use crate::error::add_breadcrumb;
use crate::middleware::{ApiTokens, OptionalAuth};
use crate::routes::local_redirect;
use crate::state::AppState;

/// Toggle favorite form data.
#[derive(Debug, Deserialize)]
pub struct ToggleFavoriteForm {
    pub flower_id: FlowerId,
    pub redirect_to: Option<String>,
}

/// Add the flower to the visitor's favorites, or remove it.
#[instrument(skip(state, user, tokens, form), fields(flower_id = %form.flower_id))]
pub async fn toggle(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    ApiTokens(tokens): ApiTokens,
    Form(form): Form<ToggleFavoriteForm>,
) -> Response {
    let Some(user) = user else {
        return Redirect::to("/?error=login_required").into_response();
    };

    let back = local_redirect(form.redirect_to.as_deref(), "/");

    match state
        .favorites()
        .toggle(user.id, form.flower_id, state.api(), &tokens)
        .await
    {
        Ok(is_favorite) => {
            let flower_id = form.flower_id.to_string();
            add_breadcrumb(
                "favorites",
                if is_favorite { "Added favorite" } else { "Removed favorite" },
                Some(&[("flower_id", &flower_id)]),
            );
            Redirect::to(&back).into_response()
        }
        Err(e) => {
            tracing::warn!("Failed to toggle favorite: {e}");
            Redirect::to("/?error=favorite_failed").into_response()
        }
    }
}
