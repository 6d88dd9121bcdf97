//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use common::{Context, IdempotencyKey, Money};

use crate::error::PaymentError;

/// Result of a successful payment charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentResult {
    /// The payment ID assigned by the payment service.
    pub payment_id: String,
}

/// Trait for payment processing operations.
///
/// Implementations must treat the idempotency key as a charge identity:
/// charging twice with the same key bills once.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges `amount` under `idempotency_key`.
    async fn charge(
        &self,
        ctx: &Context,
        amount: Money,
        idempotency_key: &IdempotencyKey,
    ) -> Result<PaymentResult, PaymentError>;
}

#[derive(Debug, Clone)]
struct ChargeRecord {
    payment_id: String,
    amount: Money,
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    charges: HashMap<IdempotencyKey, ChargeRecord>,
    next_id: u32,
    fail_on_charge: bool,
}

/// In-memory payment gateway that deduplicates charges by key.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<Mutex<InMemoryPaymentState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory payment gateway.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, InMemoryPaymentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Configures the gateway to decline every charge.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state().fail_on_charge = fail;
    }

    /// Returns the number of distinct charges.
    pub fn charge_count(&self) -> usize {
        self.state().charges.len()
    }

    /// Returns the amount charged under a key, if any.
    pub fn charged_amount(&self, idempotency_key: &IdempotencyKey) -> Option<Money> {
        self.state()
            .charges
            .get(idempotency_key)
            .map(|record| record.amount)
    }

    /// Sum of all distinct charges.
    pub fn total_charged(&self) -> Money {
        self.state()
            .charges
            .values()
            .fold(Money::zero(), |acc, record| acc + record.amount)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    #[tracing::instrument(skip(self, ctx), fields(idempotency_key = %idempotency_key))]
    async fn charge(
        &self,
        ctx: &Context,
        amount: Money,
        idempotency_key: &IdempotencyKey,
    ) -> Result<PaymentResult, PaymentError> {
        ctx.check()?;
        let mut state = self.state();

        if state.fail_on_charge {
            return Err(PaymentError::Declined("Payment declined".to_string()));
        }

        if let Some(existing) = state.charges.get(idempotency_key) {
            tracing::debug!(payment_id = %existing.payment_id, "duplicate charge ignored");
            return Ok(PaymentResult {
                payment_id: existing.payment_id.clone(),
            });
        }

        state.next_id += 1;
        let payment_id = format!("PAY-{:04}", state.next_id);
        state.charges.insert(
            idempotency_key.clone(),
            ChargeRecord {
                payment_id: payment_id.clone(),
                amount,
            },
        );
        tracing::info!(%payment_id, %amount, "payment charged");

        Ok(PaymentResult { payment_id })
    }
}
