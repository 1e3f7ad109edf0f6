//! Simulated payment gateway.
//!
//! Stands in for a real provider SDK behind the `PaymentGateway` trait; the
//! settlement coordinator only ever sees the trait, so a production
//! integration swaps in without touching the purchase flow.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::models::enums::PaymentKind;

/// Extra fields the caller supplies for the chosen method (card data today).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentDetails {
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default)]
    pub card_holder: Option<String>,
}

/// One charge attempt.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub method: PaymentKind,
    pub installments: i32,
    pub amount: Decimal,
    pub details: PaymentDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Approved,
    Completed,
    Pending,
    Declined,
}

/// What the gateway reported. `approved == false` means the purchase must
/// not proceed; the message is surfaced to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcome {
    pub approved: bool,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: &ChargeRequest) -> PaymentOutcome;
}

/// Outcome source for card charges, injectable so tests can force both the
/// approved and declined branches.
pub trait CardDecision: Send + Sync {
    fn approve(&self) -> bool;
}

/// Production behavior: approve with a fixed probability (0.9 by default).
pub struct RandomCardDecision {
    approval_rate: f64,
}

impl RandomCardDecision {
    pub fn new(approval_rate: f64) -> Self {
        Self { approval_rate }
    }
}

impl Default for RandomCardDecision {
    fn default() -> Self {
        Self::new(0.9)
    }
}

impl CardDecision for RandomCardDecision {
    fn approve(&self) -> bool {
        rand::thread_rng().gen_range(0.0..1.0) < self.approval_rate
    }
}

/// Fixed outcome, for deterministic tests.
pub struct FixedCardDecision(pub bool);

impl CardDecision for FixedCardDecision {
    fn approve(&self) -> bool {
        self.0
    }
}

/// In-process gateway simulation.
pub struct SimulatedGateway {
    decision: Arc<dyn CardDecision>,
    delay: Duration,
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self {
            decision: Arc::new(RandomCardDecision::default()),
            delay: Duration::from_secs(1),
        }
    }

    pub fn with_decision(mut self, decision: Arc<dyn CardDecision>) -> Self {
        self.decision = decision;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(&self, request: &ChargeRequest) -> PaymentOutcome {
        // Models real gateway latency; the await point keeps other requests
        // flowing while this one waits.
        tokio::time::sleep(self.delay).await;

        let outcome = match request.method {
            PaymentKind::Card => self.charge_card(request),
            PaymentKind::InstantTransfer => PaymentOutcome {
                approved: true,
                transaction_id: Some(transaction_id("IT")),
                status: PaymentStatus::Completed,
                message: "instant transfer completed".to_string(),
                barcode: None,
                due_date: None,
            },
            PaymentKind::BankSlip => PaymentOutcome {
                approved: true,
                transaction_id: Some(transaction_id("BS")),
                status: PaymentStatus::Pending,
                message: "bank slip issued".to_string(),
                barcode: Some(barcode()),
                due_date: Some((Utc::now() + chrono::Duration::days(3)).date_naive()),
            },
            PaymentKind::Other => PaymentOutcome {
                approved: false,
                transaction_id: None,
                status: PaymentStatus::Declined,
                message: "unsupported payment method".to_string(),
                barcode: None,
                due_date: None,
            },
        };

        info!(
            status = ?outcome.status,
            approved = outcome.approved,
            "simulated {:?} charge for {}",
            request.method,
            request.amount
        );
        outcome
    }
}

impl SimulatedGateway {
    fn charge_card(&self, request: &ChargeRequest) -> PaymentOutcome {
        if request
            .details
            .card_number
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .is_empty()
        {
            return PaymentOutcome {
                approved: false,
                transaction_id: None,
                status: PaymentStatus::Declined,
                message: "incomplete card data".to_string(),
                barcode: None,
                due_date: None,
            };
        }

        if self.decision.approve() {
            PaymentOutcome {
                approved: true,
                transaction_id: Some(transaction_id("CC")),
                status: PaymentStatus::Approved,
                message: "payment approved by the issuing bank".to_string(),
                barcode: None,
                due_date: None,
            }
        } else {
            PaymentOutcome {
                approved: false,
                transaction_id: Some(transaction_id("CC")),
                status: PaymentStatus::Declined,
                message: "card declined by the issuer".to_string(),
                barcode: None,
                due_date: None,
            }
        }
    }
}

fn transaction_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// 44-digit numeric barcode, the fixed length of the bank-slip format.
fn barcode() -> String {
    let mut rng = rand::thread_rng();
    (0..44).map(|_| rng.gen_range(0..=9).to_string()).collect()
}
