//! Per-user favorites cache.
//!
//! Catalog cards need to know which flowers the visitor has favorited.
//! Rather than asking the API once per card, the list is loaded once per
//! user and kept for five minutes. Every mutation goes through this type and
//! drops the cached entry, so the next read sees the API's view again.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::instrument;

use florist_core::{FavoriteId, FlowerId, UserId};

use crate::api::{ApiClient, ApiError, Favorite, TokenStore};

const FAVORITES_TTL: Duration = Duration::from_secs(300);
const FAVORITES_CAPACITY: u64 = 10_000;

/// A user's favorites as last seen from the API.
pub type FavoriteList = Arc<Vec<Favorite>>;

/// Favorites keyed by user, shared across requests.
#[derive(Clone)]
pub struct FavoritesCache {
    cache: Cache<UserId, FavoriteList>,
}

impl Default for FavoritesCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FavoritesCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(FAVORITES_CAPACITY)
                .time_to_live(FAVORITES_TTL)
                .build(),
        }
    }

    /// Return the cached list, loading it from the API on a miss.
    ///
    /// # Errors
    ///
    /// Returns the API error when the list has to be loaded and the call fails.
    #[instrument(skip(self, api, tokens), fields(user_id = %user))]
    pub async fn get_or_load(
        &self,
        user: UserId,
        api: &ApiClient,
        tokens: &TokenStore,
    ) -> Result<FavoriteList, ApiError> {
        if let Some(list) = self.cache.get(&user).await {
            return Ok(list);
        }

        let list: FavoriteList = Arc::new(api.list_favorites(tokens).await?);
        self.cache.insert(user, Arc::clone(&list)).await;
        Ok(list)
    }

    /// The favorite entry for a flower, if the user has one.
    ///
    /// # Errors
    ///
    /// Returns the API error when the list cannot be loaded.
    pub async fn find(
        &self,
        user: UserId,
        flower: FlowerId,
        api: &ApiClient,
        tokens: &TokenStore,
    ) -> Result<Option<FavoriteId>, ApiError> {
        let list = self.get_or_load(user, api, tokens).await?;
        Ok(list.iter().find(|f| f.flower.id == flower).map(|f| f.id))
    }

    /// Add the flower to favorites, or remove it when already present.
    ///
    /// Returns whether the flower is a favorite afterwards.
    ///
    /// # Errors
    ///
    /// Returns the API error of the lookup or of the mutation.
    #[instrument(skip(self, api, tokens), fields(user_id = %user, flower_id = %flower))]
    pub async fn toggle(
        &self,
        user: UserId,
        flower: FlowerId,
        api: &ApiClient,
        tokens: &TokenStore,
    ) -> Result<bool, ApiError> {
        let existing = self.find(user, flower, api, tokens).await?;
        let result = match existing {
            Some(id) => api.remove_favorite(id, tokens).await.map(|()| false),
            None => api.add_favorite(flower, tokens).await.map(|_| true),
        };
        self.invalidate(user).await;
        result
    }

    /// Remove a favorite by its own id.
    ///
    /// # Errors
    ///
    /// Returns the API error of the delete call.
    #[instrument(skip(self, api, tokens), fields(user_id = %user, favorite_id = %favorite))]
    pub async fn remove(
        &self,
        user: UserId,
        favorite: FavoriteId,
        api: &ApiClient,
        tokens: &TokenStore,
    ) -> Result<(), ApiError> {
        let result = api.remove_favorite(favorite, tokens).await;
        self.invalidate(user).await;
        result
    }

    /// Drop the cached list for a user.
    pub async fn invalidate(&self, user: UserId) {
        self.cache.invalidate(&user).await;
    }
}
