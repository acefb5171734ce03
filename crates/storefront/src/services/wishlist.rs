//! Per-user wishlist over the `wishlist` table.
//!
//! Rows carry their own id so a single toggle can delete exactly one entry
//! without compound predicates.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use kiosk_core::{ProductId, UserId};

use crate::gateway::{GatewayError, RemoteGateway, decode};

/// Table wishlist entries are stored in.
pub const WISHLIST_TABLE: &str = "wishlist";

/// Errors from wishlist operations.
#[derive(Debug, thiserror::Error)]
pub enum WishlistError {
    /// No identity; the wishlist is per-user.
    #[error("not signed in")]
    NotAuthenticated,

    /// The backend rejected or failed the request.
    #[error("backend error: {0}")]
    Gateway(#[from] GatewayError),
}

/// One wishlist row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct WishlistEntry {
    id: Uuid,
    user_id: UserId,
    product_id: ProductId,
    created_at: DateTime<Utc>,
}

/// Per-user wishlist.
pub struct WishlistStore {
    gateway: Arc<dyn RemoteGateway>,
}

impl WishlistStore {
    /// Create a wishlist store.
    #[must_use]
    pub const fn new(gateway: Arc<dyn RemoteGateway>) -> Self {
        Self { gateway }
    }

    /// Toggle a product on the wishlist. Returns `true` if the product is
    /// on the list afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`WishlistError::NotAuthenticated`] without an identity and
    /// [`WishlistError::Gateway`] on remote failure.
    #[instrument(skip(self), fields(product = %product_id))]
    pub async fn toggle(&self, product_id: &ProductId) -> Result<bool, WishlistError> {
        let user_id = self.identity().await?;
        let entries = self.entries_for(user_id).await?;

        match entries.iter().find(|e| &e.product_id == product_id) {
            Some(entry) => {
                self.gateway
                    .delete(WISHLIST_TABLE, "id", &entry.id.to_string())
                    .await?;
                Ok(false)
            }
            None => {
                let entry = WishlistEntry {
                    id: Uuid::new_v4(),
                    user_id,
                    product_id: product_id.clone(),
                    created_at: Utc::now(),
                };
                let record = serde_json::to_value(&entry).map_err(GatewayError::from)?;
                self.gateway.insert(WISHLIST_TABLE, record).await?;
                Ok(true)
            }
        }
    }

    /// Product ids on the user's wishlist, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`WishlistError::NotAuthenticated`] without an identity and
    /// [`WishlistError::Gateway`] on remote failure.
    pub async fn list(&self) -> Result<Vec<ProductId>, WishlistError> {
        let user_id = self.identity().await?;
        let mut entries = self.entries_for(user_id).await?;
        entries.sort_by_key(|e| e.created_at);
        Ok(entries.into_iter().map(|e| e.product_id).collect())
    }

    /// Whether a product is on the user's wishlist.
    ///
    /// # Errors
    ///
    /// Returns [`WishlistError::NotAuthenticated`] without an identity and
    /// [`WishlistError::Gateway`] on remote failure.
    pub async fn contains(&self, product_id: &ProductId) -> Result<bool, WishlistError> {
        Ok(self.list().await?.contains(product_id))
    }

    async fn identity(&self) -> Result<UserId, WishlistError> {
        Ok(self
            .gateway
            .current_identity()
            .await?
            .ok_or(WishlistError::NotAuthenticated)?
            .id)
    }

    async fn entries_for(&self, user_id: UserId) -> Result<Vec<WishlistEntry>, WishlistError> {
        let rows = self
            .gateway
            .find_all(WISHLIST_TABLE, Some(("user_id", &user_id.to_string())))
            .await?;
        rows.into_iter()
            .map(decode::<WishlistEntry>)
            .collect::<Result<_, _>>()
            .map_err(WishlistError::Gateway)
    }
}
