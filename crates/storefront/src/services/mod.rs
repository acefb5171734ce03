//! Client-side services: stores, workflows, and sessions.
//!
//! Each service owns its state exclusively, takes the gateway by
//! `Arc<dyn RemoteGateway>`, and publishes observable snapshots where the
//! UI needs to re-render on change.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod profile;
pub mod wishlist;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartStore};
pub use catalog::ProductCatalog;
pub use checkout::{CheckoutError, CheckoutPhase, CheckoutState, CheckoutWorkflow};
pub use orders::{OrderHistory, OrderHistoryError};
pub use profile::{ProfileError, ProfileSession};
pub use wishlist::{WishlistError, WishlistStore};
