//! Integration tests for Kiosk.
//!
//! End-to-end workflow tests over the in-memory gateway: sign-in through
//! order placement, profile bootstrap, and catalog/wishlist flows. No
//! network or hosted backend is required.
//!
//! # Test Categories
//!
//! - `checkout_flow` - Cart consistency and the checkout state machine
//! - `profile_session` - Profile fetch-or-create, update, avatar
//! - `catalog_wishlist` - Product listing cache and wishlist toggles

use std::sync::{Arc, Once};

use kiosk_core::{DiscountPercent, Email, Money, ProductId, UserId};
use kiosk_storefront::gateway::{MemoryGateway, RemoteGateway};
use kiosk_storefront::models::LineItem;
use kiosk_storefront::services::{CartStore, CheckoutWorkflow, ProfileSession};

/// Initialize test logging once (honors `RUST_LOG`).
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// A wired storefront session over the in-memory gateway.
pub struct TestContext {
    pub gateway: Arc<MemoryGateway>,
    pub cart: Arc<CartStore>,
    pub checkout: CheckoutWorkflow,
    pub profile: ProfileSession,
    pub user_id: UserId,
}

impl TestContext {
    /// A context signed in as `jane.doe@example.com`.
    #[must_use]
    pub fn signed_in() -> Self {
        init_tracing();
        let gateway = Arc::new(MemoryGateway::new());
        let user_id = UserId::generate();
        gateway.sign_in_as(user_id, &jane());

        let cart = Arc::new(CartStore::new());
        let checkout = CheckoutWorkflow::new(
            Arc::clone(&gateway) as Arc<dyn RemoteGateway>,
            Arc::clone(&cart),
        );
        let profile = ProfileSession::new(Arc::clone(&gateway) as Arc<dyn RemoteGateway>);

        Self {
            gateway,
            cart,
            checkout,
            profile,
            user_id,
        }
    }

    /// Fill the cart with the standard two-line fixture:
    /// A ($100, 10% off, qty 2, selected) and B ($50, qty 1, not selected).
    pub fn fill_cart(&self) {
        self.cart
            .add_item(
                LineItem::new(
                    ProductId::from("a"),
                    "Item A",
                    Money::from_major_units(100),
                    DiscountPercent::from_whole(10).expect("valid discount"),
                )
                .with_quantity(2),
            )
            .expect("add item a");

        let mut b = LineItem::new(
            ProductId::from("b"),
            "Item B",
            Money::from_major_units(50),
            DiscountPercent::ZERO,
        );
        b.selected = false;
        self.cart.add_item(b).expect("add item b");
    }
}

/// The standard test account email.
#[must_use]
pub fn jane() -> Email {
    Email::parse("jane.doe@example.com").expect("valid email")
}
