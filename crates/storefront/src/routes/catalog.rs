//! Catalog route handlers.

use std::collections::HashSet;

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use tower_sessions::Session;
use tracing::instrument;

use florist_core::{Flower, FlowerId};

use crate::api::{TokenStore, User};
use crate::error::Result;
use crate::filters;
use crate::middleware::ApiTokens;
use crate::routes::{AlertQuery, Nav};
use crate::state::AppState;

/// A catalog card.
#[derive(Debug, Clone)]
pub struct FlowerCard {
    pub flower: Flower,
    pub is_favorite: bool,
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogIndexTemplate {
    pub nav: Nav,
    pub alert: Option<String>,
    pub cards: Vec<FlowerCard>,
    /// Where card actions return to.
    pub back: String,
}

/// Flower detail template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/show.html")]
pub struct CatalogShowTemplate {
    pub nav: Nav,
    pub card: FlowerCard,
    pub back: String,
}

/// Ids of the visitor's favorite flowers; empty when signed out or on error.
async fn favorite_ids(state: &AppState, user: Option<&User>, tokens: &TokenStore) -> HashSet<FlowerId> {
    let Some(user) = user else {
        return HashSet::new();
    };

    match state.favorites().get_or_load(user.id, state.api(), tokens).await {
        Ok(list) => list.iter().map(|f| f.flower.id).collect(),
        Err(e) => {
            tracing::debug!("Favorites unavailable for catalog: {e}");
            HashSet::new()
        }
    }
}

/// Display the catalog.
#[instrument(skip(state, session, tokens, query))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    ApiTokens(tokens): ApiTokens,
    Query(query): Query<AlertQuery>,
) -> CatalogIndexTemplate {
    let nav = Nav::load(&session).await;
    let mut alert = query.message();

    let flowers = match state.api().list_flowers(&tokens).await {
        Ok(flowers) => flowers,
        Err(e) => {
            tracing::error!("Failed to load catalog: {e}");
            alert.get_or_insert_with(|| "Could not load the catalog. Please try again later.".to_string());
            Vec::new()
        }
    };

    let favorites = favorite_ids(&state, nav.user.as_ref(), &tokens).await;
    let cards = flowers
        .into_iter()
        .map(|flower| FlowerCard {
            is_favorite: favorites.contains(&flower.id),
            flower,
        })
        .collect();

    CatalogIndexTemplate {
        nav,
        alert,
        cards,
        back: "/".to_string(),
    }
}

/// Display a single flower.
#[instrument(skip(state, session, tokens))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    ApiTokens(tokens): ApiTokens,
    Path(id): Path<FlowerId>,
) -> Result<CatalogShowTemplate> {
    let nav = Nav::load(&session).await;
    let flower = state.api().get_flower(id, &tokens).await?;
    let favorites = favorite_ids(&state, nav.user.as_ref(), &tokens).await;

    Ok(CatalogShowTemplate {
        back: format!("/flowers/{id}"),
        card: FlowerCard {
            is_favorite: favorites.contains(&flower.id),
            flower,
        },
        nav,
    })
}
