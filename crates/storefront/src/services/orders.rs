//! Order history for the signed-in user.

use std::sync::Arc;

use tracing::instrument;

use crate::gateway::{GatewayError, RemoteGateway, decode};
use crate::models::Order;
use crate::services::checkout::ORDERS_TABLE;

/// Errors from order history reads.
#[derive(Debug, thiserror::Error)]
pub enum OrderHistoryError {
    /// No identity; orders are per-user.
    #[error("not signed in")]
    NotAuthenticated,

    /// The backend rejected or failed the request.
    #[error("backend error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Read-only view over the user's placed orders.
pub struct OrderHistory {
    gateway: Arc<dyn RemoteGateway>,
}

impl OrderHistory {
    /// Create an order history view.
    #[must_use]
    pub const fn new(gateway: Arc<dyn RemoteGateway>) -> Self {
        Self { gateway }
    }

    /// The user's orders, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`OrderHistoryError::NotAuthenticated`] without an identity
    /// and [`OrderHistoryError::Gateway`] on remote failure.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Order>, OrderHistoryError> {
        let identity = self
            .gateway
            .current_identity()
            .await?
            .ok_or(OrderHistoryError::NotAuthenticated)?;

        let rows = self
            .gateway
            .find_all(ORDERS_TABLE, Some(("user_id", &identity.id.to_string())))
            .await?;

        let mut orders: Vec<Order> = rows
            .into_iter()
            .map(decode::<Order>)
            .collect::<Result<_, _>>()
            .map_err(OrderHistoryError::Gateway)?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}
