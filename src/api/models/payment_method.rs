use serde::{Deserialize, Serialize};

use super::enums::PaymentKind;

/// A named settlement channel. Read-only reference data, seeded at schema
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: i64,
    pub name: String,
    pub max_installments: i32,
    pub active: bool,
}

impl PaymentMethod {
    pub fn kind(&self) -> PaymentKind {
        PaymentKind::from_name(&self.name)
    }

    /// Discount blurb shown next to the method in listings.
    pub fn benefit(&self) -> &'static str {
        match self.kind() {
            PaymentKind::InstantTransfer => "5% discount",
            PaymentKind::BankSlip => "3% discount when paid in full",
            _ => "No discount",
        }
    }
}
