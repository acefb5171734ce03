//! Order records written at checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use kiosk_core::{DiscountPercent, Money, OrderId, ProductId, UserId};

use super::cart::LineItem;

/// One purchased line, frozen at order time.
///
/// All money travels as integer minor units; the full-precision totals are
/// rounded half-even exactly once, here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Product the line was created from.
    pub product_id: ProductId,
    /// Display name at purchase time.
    pub name: String,
    /// Units purchased.
    pub quantity: u32,
    /// Undiscounted unit price in minor units.
    pub unit_price_cents: i64,
    /// Discount applied to the unit price.
    pub discount: DiscountPercent,
    /// Line total in minor units.
    pub line_total_cents: i64,
}

impl From<&LineItem> for OrderLine {
    fn from(item: &LineItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price_cents: item.unit_price.to_minor_units(),
            discount: item.discount,
            line_total_cents: item.line_total().to_minor_units(),
        }
    }
}

/// An order as inserted into the `orders` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Client-generated order id.
    pub id: OrderId,
    /// The purchasing identity.
    pub user_id: UserId,
    /// Selected payment method id from the fixed catalog.
    pub payment_method: String,
    /// Storage path of the proof-of-payment image.
    pub payment_proof_path: String,
    /// Purchased lines.
    pub lines: Vec<OrderLine>,
    /// Order total in minor units.
    pub total_cents: i64,
    /// When the order was placed (client clock).
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// The order total as money.
    #[must_use]
    pub fn total(&self) -> Money {
        Money::from_minor_units(self.total_cents)
    }
}

/// Receipt returned to the caller after a successful placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    /// Id of the inserted order.
    pub order_id: OrderId,
    /// Charged total.
    pub total: Money,
    /// Number of purchased lines.
    pub line_count: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_line_freezes_rounded_totals() {
        let item = LineItem::new(
            ProductId::from("boots"),
            "Kodiak Trek",
            Money::from_major_units(652),
            DiscountPercent::from_whole(20).unwrap(),
        )
        .with_quantity(2);

        let line = OrderLine::from(&item);
        assert_eq!(line.unit_price_cents, 65_200);
        assert_eq!(line.line_total_cents, 104_320);
    }
}
