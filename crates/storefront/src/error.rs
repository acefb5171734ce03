//! Unified error handling.
//!
//! Provides a unified `StoreError` type for callers that drive several
//! services behind one surface (e.g., the host app's view layer). Each
//! service keeps its own error enum; this type folds them together and
//! maps them to user-facing messages without exposing backend detail.

use thiserror::Error;

use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::checkout::CheckoutError;
use crate::services::orders::OrderHistoryError;
use crate::services::profile::ProfileError;
use crate::services::wishlist::WishlistError;

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Cart mutation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout operation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Profile operation failed.
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Wishlist operation failed.
    #[error("Wishlist error: {0}")]
    Wishlist(#[from] WishlistError),

    /// Order history read failed.
    #[error("Order history error: {0}")]
    Orders(#[from] OrderHistoryError),

    /// Backend call failed outside a workflow.
    #[error("Backend error: {0}")]
    Gateway(#[from] GatewayError),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl StoreError {
    /// A message suitable for direct display.
    ///
    /// Validation and precondition errors read back what the user did;
    /// backend failures collapse to a generic retry prompt so raw
    /// transport detail never reaches the screen.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Cart(err) => err.to_string(),
            Self::Checkout(err) => match err {
                CheckoutError::Gateway(_) => RETRY_MESSAGE.to_owned(),
                other => other.to_string(),
            },
            Self::Profile(err) => match err {
                ProfileError::Gateway(_) => RETRY_MESSAGE.to_owned(),
                other => other.to_string(),
            },
            Self::Auth(err) => match err {
                AuthError::Gateway(_) => RETRY_MESSAGE.to_owned(),
                other => other.to_string(),
            },
            Self::Wishlist(err) => match err {
                WishlistError::Gateway(_) => RETRY_MESSAGE.to_owned(),
                WishlistError::NotAuthenticated => err.to_string(),
            },
            Self::Orders(err) => match err {
                OrderHistoryError::Gateway(_) => RETRY_MESSAGE.to_owned(),
                OrderHistoryError::NotAuthenticated => err.to_string(),
            },
            Self::Gateway(_) | Self::Config(_) => RETRY_MESSAGE.to_owned(),
        }
    }
}

const RETRY_MESSAGE: &str = "Something went wrong. Please try again.";

/// Result type alias for `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;
