//! Product records from the `products` table.

use serde::{Deserialize, Serialize};

use kiosk_core::{Money, ProductId};

/// A storefront product.
///
/// Prices are stored as integer minor units in the backend; use
/// [`Product::price`] for arithmetic and display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Stable product key.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price in minor units (cents).
    pub price_cents: i64,
    /// Marketing copy.
    #[serde(default)]
    pub description: String,
    /// Storage path of the product image, relative to the images bucket.
    #[serde(default)]
    pub image_path: Option<String>,
}

impl Product {
    /// The unit price as money.
    #[must_use]
    pub fn price(&self) -> Money {
        Money::from_minor_units(self.price_cents)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decodes_backend_record() {
        let product: Product = serde_json::from_value(json!({
            "id": "p1",
            "name": "Succulent Plant",
            "price_cents": 12_50,
        }))
        .unwrap();

        assert_eq!(product.price().to_string(), "$12.50");
        assert_eq!(product.image_path, None);
        assert_eq!(product.description, "");
    }
}
