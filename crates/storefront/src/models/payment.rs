//! Payment method reference data.
//!
//! A fixed catalog: the client never persists these, it only gates checkout
//! on a valid selection.

/// A payment method offered at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentMethod {
    /// Stable identifier submitted with the order.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Short description shown under the name.
    pub description: &'static str,
}

/// The fixed payment method catalog.
pub const PAYMENT_METHODS: [PaymentMethod; 3] = [
    PaymentMethod {
        id: "bank_transfer",
        name: "Bank Transfer",
        description: "Transfer from any major bank account",
    },
    PaymentMethod {
        id: "ewallet",
        name: "E-Wallet",
        description: "Pay with your mobile wallet balance",
    },
    PaymentMethod {
        id: "cod",
        name: "Cash on Delivery",
        description: "Pay when the package arrives",
    },
];

/// Look up a catalog entry by id.
#[must_use]
pub fn payment_method(id: &str) -> Option<&'static PaymentMethod> {
    PAYMENT_METHODS.iter().find(|method| method.id == id)
}
