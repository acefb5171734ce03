//! Domain models.
//!
//! Wire-facing types carry integer minor units for money so no binary
//! floating point ever crosses the backend boundary; the services convert
//! to [`kiosk_core::Money`] at the edges.

pub mod cart;
pub mod order;
pub mod payment;
pub mod product;
pub mod profile;

pub use cart::{CartSnapshot, LineItem};
pub use order::{Order, OrderLine, PlacedOrder};
pub use payment::{PAYMENT_METHODS, PaymentMethod, payment_method};
pub use product::Product;
pub use profile::Profile;
