//! Checkout coordinator: the saga controller.

use std::sync::Arc;
use std::time::Duration;

use common::{Context, IdempotencyKey, ReservationId};
use idempotency::{Claim, IdempotencyStore};
use tracing::Instrument;

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, InventoryError, Result};
use crate::request::{CheckoutReceipt, CheckoutRequest};
use crate::retry::RetryPolicy;
use crate::services::inventory::{InventoryGateway, ReservationTicket};
use crate::services::payment::PaymentGateway;
use crate::steps;

/// Orchestrates checkouts across inventory and payment.
///
/// The coordinator drives a 3-step saga (reserve → charge → complete). Each
/// request is guarded by an idempotency key: a completed checkout is replayed
/// from the store, and a concurrent duplicate is rejected. When charging or
/// completing fails the reservation is released.
pub struct CheckoutCoordinator<I, P, K>
where
    I: InventoryGateway,
    P: PaymentGateway,
    K: IdempotencyStore,
{
    inventory: Arc<I>,
    payment: P,
    idempotency: Arc<K>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl<I, P, K> CheckoutCoordinator<I, P, K>
where
    I: InventoryGateway + 'static,
    P: PaymentGateway,
    K: IdempotencyStore + 'static,
{
    /// Creates a coordinator with default retry and timeout settings.
    pub fn new(inventory: I, payment: P, idempotency: K) -> Self {
        Self::from_config(inventory, payment, idempotency, &CheckoutConfig::default())
    }

    /// Creates a coordinator using the retry and timeout settings of `config`.
    pub fn from_config(inventory: I, payment: P, idempotency: K, config: &CheckoutConfig) -> Self {
        Self {
            inventory: Arc::new(inventory),
            payment,
            idempotency: Arc::new(idempotency),
            retry: RetryPolicy::new(config.retry),
            timeout: config.timeout,
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// A fresh context bounded by the checkout timeout.
    pub fn request_context(&self) -> Context {
        Context::with_timeout(self.timeout)
    }

    /// Runs a checkout under a fresh request context.
    pub async fn execute(&self, request: CheckoutRequest) -> Result<CheckoutReceipt> {
        let ctx = self.request_context();
        self.checkout(&ctx, request).await
    }

    /// Runs a checkout.
    ///
    /// Returns the cached receipt without side effects if the key already
    /// completed, and [`CheckoutError::DuplicateInFlight`] if another attempt
    /// holds it. Once the key is claimed it is marked succeeded or failed
    /// exactly once, even if `ctx` has expired by then. If this future is
    /// dropped or a collaborator panics after the claim, the held reservation
    /// is released and the key is settled on a background task.
    #[tracing::instrument(
        skip(self, ctx, request),
        fields(
            idempotency_key = %request.idempotency_key,
            item_id = %request.item_id,
            quantity = request.quantity,
        )
    )]
    pub async fn checkout(&self, ctx: &Context, request: CheckoutRequest) -> Result<CheckoutReceipt> {
        metrics::counter!("checkout_executions_total").increment(1);
        let checkout_start = std::time::Instant::now();

        request.validate()?;
        ctx.check()?;

        match self.idempotency.reserve_key(ctx, &request.idempotency_key).await? {
            Claim::Replay(cached) => {
                metrics::counter!("checkout_replayed_total").increment(1);
                tracing::info!("replaying completed checkout");
                return Ok(serde_json::from_value(cached)?);
            }
            Claim::Claimed => {}
        }

        let mut guard = OutcomeGuard {
            inventory: Arc::clone(&self.inventory),
            idempotency: Arc::clone(&self.idempotency),
            retry: self.retry.clone(),
            timeout: self.timeout,
            key: request.idempotency_key.clone(),
            step: steps::STEP_RESERVE_INVENTORY,
            reservation: None,
            receipt: None,
            recorded: false,
        };
        let outcome = self.run_steps(ctx, &request, &mut guard).await;
        guard.record(&outcome).await;

        let duration = checkout_start.elapsed().as_secs_f64();
        metrics::histogram!("checkout_duration_seconds").record(duration);
        match &outcome {
            Ok(receipt) => {
                metrics::counter!("checkout_completed_total").increment(1);
                tracing::info!(
                    reservation_id = %receipt.reservation_id,
                    total_fee = %receipt.total_fee,
                    duration,
                    "checkout completed"
                );
            }
            Err(err) => {
                metrics::counter!("checkout_failed_total").increment(1);
                tracing::warn!(error = %err, duration, "checkout failed");
            }
        }
        outcome
    }

    /// The saga body. Runs only while this attempt owns the key.
    async fn run_steps(
        &self,
        ctx: &Context,
        request: &CheckoutRequest,
        guard: &mut OutcomeGuard<I, K>,
    ) -> Result<CheckoutReceipt> {
        tracing::info!(step = steps::STEP_RESERVE_INVENTORY, "saga step started");
        let ReservationTicket {
            reservation_id,
            total_fee,
        } = self
            .retry
            .run(ctx, steps::STEP_RESERVE_INVENTORY, || {
                self.inventory
                    .reserve(ctx, request.item_id, request.quantity)
            })
            .await?;
        guard.hold(reservation_id, steps::STEP_CHARGE_PAYMENT);

        tracing::info!(step = steps::STEP_CHARGE_PAYMENT, %reservation_id, %total_fee, "saga step started");
        if let Err(err) = self
            .payment
            .charge(ctx, total_fee, &request.idempotency_key)
            .await
        {
            tracing::warn!(%reservation_id, error = %err, "payment failed, releasing reservation");
            // Best-effort: a failed release is logged and counted, the charge error wins.
            let _ = self
                .release(reservation_id, steps::STEP_CHARGE_PAYMENT)
                .await;
            guard.settle();
            return Err(err.into());
        }

        guard.hold(reservation_id, steps::STEP_COMPLETE_RESERVATION);
        tracing::info!(step = steps::STEP_COMPLETE_RESERVATION, %reservation_id, "saga step started");
        let completed = self
            .retry
            .run(ctx, steps::STEP_COMPLETE_RESERVATION, || {
                self.inventory.complete(ctx, reservation_id)
            })
            .await;
        if let Err(err) = completed {
            tracing::warn!(%reservation_id, error = %err, "completion failed, releasing reservation");
            let released = self
                .release(reservation_id, steps::STEP_COMPLETE_RESERVATION)
                .await;
            guard.settle();
            return Err(match released {
                Ok(()) => err.into(),
                Err(source) => CheckoutError::CompensationFailed {
                    reservation_id,
                    failed_step: steps::STEP_COMPLETE_RESERVATION,
                    source,
                },
            });
        }
        guard.settle();

        Ok(CheckoutReceipt {
            reservation_id,
            item_id: request.item_id,
            quantity: request.quantity,
            total_fee,
        })
    }

    async fn release(
        &self,
        reservation_id: ReservationId,
        failed_step: &'static str,
    ) -> std::result::Result<(), InventoryError> {
        release_reservation(
            self.inventory.as_ref(),
            &self.retry,
            self.timeout,
            reservation_id,
            failed_step,
        )
        .await
    }
}

/// Releases a reservation with retries under a detached context bounded by
/// `timeout`.
async fn release_reservation<I: InventoryGateway>(
    inventory: &I,
    retry: &RetryPolicy,
    timeout: Duration,
    reservation_id: ReservationId,
    failed_step: &'static str,
) -> std::result::Result<(), InventoryError> {
    let ctx = Context::with_timeout(timeout);
    let result = retry
        .run(&ctx, steps::STEP_RELEASE_RESERVATION, || {
            inventory.release(&ctx, reservation_id)
        })
        .await;

    match &result {
        Ok(()) => tracing::info!(%reservation_id, failed_step, "reservation released"),
        Err(err) => {
            metrics::counter!("checkout_compensation_failed_total").increment(1);
            tracing::error!(
                %reservation_id,
                failed_step,
                error = %err,
                compensation_failed = true,
                "failed to release reservation"
            );
        }
    }
    result
}

/// Settles a claimed key on every exit from a checkout.
///
/// [`OutcomeGuard::record`] commits the outcome on the normal path. If the
/// guard is dropped first (the checkout future was cancelled or a
/// collaborator panicked) the held reservation is released and the key is
/// settled on a task spawned onto the current runtime.
struct OutcomeGuard<I, K>
where
    I: InventoryGateway + 'static,
    K: IdempotencyStore + 'static,
{
    inventory: Arc<I>,
    idempotency: Arc<K>,
    retry: RetryPolicy,
    timeout: Duration,
    key: IdempotencyKey,
    /// Step in progress, for logs on abandonment.
    step: &'static str,
    /// Reservation the saga has not yet completed or released.
    reservation: Option<ReservationId>,
    /// Encoded receipt once the saga succeeded.
    receipt: Option<serde_json::Value>,
    recorded: bool,
}

impl<I, K> OutcomeGuard<I, K>
where
    I: InventoryGateway + 'static,
    K: IdempotencyStore + 'static,
{
    fn hold(&mut self, reservation_id: ReservationId, step: &'static str) {
        self.reservation = Some(reservation_id);
        self.step = step;
    }

    /// The reservation was completed or compensated.
    fn settle(&mut self) {
        self.reservation = None;
    }

    /// Commits the attempt's outcome to the idempotency store.
    async fn record(mut self, outcome: &Result<CheckoutReceipt>) {
        let ctx = Context::background();

        let recorded = match outcome.as_ref().map(serde_json::to_value) {
            Ok(Ok(receipt)) => {
                self.receipt = Some(receipt.clone());
                self.idempotency.mark_success(&ctx, &self.key, receipt).await
            }
            Ok(Err(err)) => {
                tracing::error!(error = %err, "failed to encode receipt");
                self.idempotency.mark_failure(&ctx, &self.key).await
            }
            Err(_) => self.idempotency.mark_failure(&ctx, &self.key).await,
        };
        self.recorded = true;

        if let Err(err) = recorded {
            tracing::error!(error = %err, "failed to record checkout outcome");
        }
    }
}

impl<I, K> Drop for OutcomeGuard<I, K>
where
    I: InventoryGateway + 'static,
    K: IdempotencyStore + 'static,
{
    fn drop(&mut self) {
        if self.recorded {
            return;
        }
        metrics::counter!("checkout_abandoned_total", "step" => self.step).increment(1);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::error!(
                idempotency_key = %self.key,
                step = self.step,
                "checkout abandoned outside a runtime, key stays processing until it expires"
            );
            return;
        };
        tracing::warn!(
            idempotency_key = %self.key,
            step = self.step,
            reservation_id = ?self.reservation,
            "checkout abandoned, settling in the background"
        );

        let inventory = Arc::clone(&self.inventory);
        let idempotency = Arc::clone(&self.idempotency);
        let retry = self.retry.clone();
        let timeout = self.timeout;
        let key = self.key.clone();
        let step = self.step;
        let reservation = self.reservation.take();
        let receipt = self.receipt.take();

        handle.spawn(
            async move {
                if let Some(reservation_id) = reservation {
                    // Failure is logged and counted by the release itself.
                    let _ = release_reservation(
                        inventory.as_ref(),
                        &retry,
                        timeout,
                        reservation_id,
                        step,
                    )
                    .await;
                }

                let ctx = Context::background();
                let recorded = match receipt {
                    Some(receipt) => idempotency.mark_success(&ctx, &key, receipt).await,
                    None => idempotency.mark_failure(&ctx, &key).await,
                };
                if let Err(err) = recorded {
                    tracing::error!(error = %err, "failed to record abandoned checkout");
                }
            }
            .in_current_span(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PaymentError;
    use crate::services::payment::PaymentResult;
    use crate::sleeper::InstantSleeper;
    use async_trait::async_trait;
    use common::{ContextError, ItemId, Money};
    use idempotency::{InMemoryIdempotencyStore, RecordStatus};
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct InventoryScript {
        ticket: ReservationTicket,
        reserve_error: Option<InventoryError>,
        complete_error: Option<InventoryError>,
        release_error: Option<InventoryError>,
        reserve_calls: u32,
        complete_calls: Vec<ReservationId>,
        release_calls: Vec<ReservationId>,
    }

    /// Inventory gateway whose answers are set by the test.
    #[derive(Debug, Clone)]
    struct ScriptedInventory {
        script: Arc<Mutex<InventoryScript>>,
    }

    impl ScriptedInventory {
        fn new(reservation_id: u64, total_fee: Money) -> Self {
            Self {
                script: Arc::new(Mutex::new(InventoryScript {
                    ticket: ReservationTicket {
                        reservation_id: ReservationId::new(reservation_id),
                        total_fee,
                    },
                    reserve_error: None,
                    complete_error: None,
                    release_error: None,
                    reserve_calls: 0,
                    complete_calls: Vec::new(),
                    release_calls: Vec::new(),
                })),
            }
        }

        fn fail_reserve(&self, err: InventoryError) {
            self.script.lock().unwrap().reserve_error = Some(err);
        }

        fn fail_complete(&self, err: InventoryError) {
            self.script.lock().unwrap().complete_error = Some(err);
        }

        fn fail_release(&self, err: InventoryError) {
            self.script.lock().unwrap().release_error = Some(err);
        }

        fn reserve_calls(&self) -> u32 {
            self.script.lock().unwrap().reserve_calls
        }

        fn complete_calls(&self) -> Vec<ReservationId> {
            self.script.lock().unwrap().complete_calls.clone()
        }

        fn release_calls(&self) -> Vec<ReservationId> {
            self.script.lock().unwrap().release_calls.clone()
        }
    }

    #[async_trait]
    impl InventoryGateway for ScriptedInventory {
        async fn reserve(
            &self,
            _ctx: &Context,
            _item_id: ItemId,
            _quantity: u32,
        ) -> std::result::Result<ReservationTicket, InventoryError> {
            let mut script = self.script.lock().unwrap();
            script.reserve_calls += 1;
            match &script.reserve_error {
                Some(err) => Err(err.clone()),
                None => Ok(script.ticket),
            }
        }

        async fn release(
            &self,
            _ctx: &Context,
            reservation_id: ReservationId,
        ) -> std::result::Result<(), InventoryError> {
            let mut script = self.script.lock().unwrap();
            script.release_calls.push(reservation_id);
            script.release_error.clone().map_or(Ok(()), Err)
        }

        async fn complete(
            &self,
            _ctx: &Context,
            reservation_id: ReservationId,
        ) -> std::result::Result<(), InventoryError> {
            let mut script = self.script.lock().unwrap();
            script.complete_calls.push(reservation_id);
            script.complete_error.clone().map_or(Ok(()), Err)
        }
    }

    /// Payment gateway that records charges and can be told to fail.
    #[derive(Debug, Clone, Default)]
    struct RecordingPayment {
        charges: Arc<Mutex<Vec<(Money, IdempotencyKey)>>>,
        error: Arc<Mutex<Option<PaymentError>>>,
    }

    impl RecordingPayment {
        fn fail_with(&self, err: PaymentError) {
            *self.error.lock().unwrap() = Some(err);
        }

        fn charges(&self) -> Vec<(Money, IdempotencyKey)> {
            self.charges.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentGateway for RecordingPayment {
        async fn charge(
            &self,
            _ctx: &Context,
            amount: Money,
            idempotency_key: &IdempotencyKey,
        ) -> std::result::Result<PaymentResult, PaymentError> {
            self.charges
                .lock()
                .unwrap()
                .push((amount, idempotency_key.clone()));
            match self.error.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(PaymentResult {
                    payment_id: "PAY-0001".to_string(),
                }),
            }
        }
    }

    type TestCoordinator =
        CheckoutCoordinator<ScriptedInventory, RecordingPayment, InMemoryIdempotencyStore>;

    fn setup() -> (
        TestCoordinator,
        ScriptedInventory,
        RecordingPayment,
        InMemoryIdempotencyStore,
    ) {
        let inventory = ScriptedInventory::new(5, Money::from_dollars(20));
        let payment = RecordingPayment::default();
        let store = InMemoryIdempotencyStore::new();

        let coordinator =
            CheckoutCoordinator::new(inventory.clone(), payment.clone(), store.clone())
                .with_retry_policy(RetryPolicy::default().with_sleeper(InstantSleeper));

        (coordinator, inventory, payment, store)
    }

    fn request(key: &str) -> CheckoutRequest {
        CheckoutRequest::new(ItemId::new(1), 2, key)
    }

    #[tokio::test]
    async fn test_happy_path() {
        let (coordinator, inventory, payment, store) = setup();

        let receipt = coordinator.execute(request("k1")).await.unwrap();

        assert_eq!(receipt.reservation_id, ReservationId::new(5));
        assert_eq!(receipt.total_fee, Money::from_dollars(20));
        assert_eq!(
            payment.charges(),
            vec![(Money::from_dollars(20), IdempotencyKey::new("k1"))]
        );
        assert_eq!(inventory.complete_calls(), vec![ReservationId::new(5)]);
        assert!(inventory.release_calls().is_empty());
        assert_eq!(
            store.status(&IdempotencyKey::new("k1")).await,
            Some(RecordStatus::Succeeded)
        );
    }

    #[tokio::test]
    async fn test_replay_has_no_side_effects() {
        let (coordinator, inventory, payment, _) = setup();

        let first = coordinator.execute(request("k1")).await.unwrap();
        let second = coordinator.execute(request("k1")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inventory.reserve_calls(), 1);
        assert_eq!(payment.charges().len(), 1);
        assert_eq!(inventory.complete_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_in_flight_key_is_rejected() {
        let (coordinator, inventory, _, store) = setup();
        let key = IdempotencyKey::new("k1");
        store
            .reserve_key(&Context::background(), &key)
            .await
            .unwrap();

        let err = coordinator.execute(request("k1")).await.unwrap_err();

        assert!(matches!(err, CheckoutError::DuplicateInFlight { .. }));
        assert_eq!(inventory.reserve_calls(), 0);
        assert_eq!(store.status(&key).await, Some(RecordStatus::Processing));
    }

    #[tokio::test]
    async fn test_reserve_retries_exhausted() {
        let (coordinator, inventory, payment, store) = setup();
        inventory.fail_reserve(InventoryError::Network("503".into()));

        let err = coordinator.execute(request("k1")).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Inventory(InventoryError::Network(_))));
        assert_eq!(inventory.reserve_calls(), 5);
        assert!(payment.charges().is_empty());
        assert_eq!(store.status(&IdempotencyKey::new("k1")).await, None);
    }

    #[tokio::test]
    async fn test_insufficient_stock_is_not_retried() {
        let (coordinator, inventory, _, store) = setup();
        inventory.fail_reserve(InventoryError::InsufficientStock {
            item_id: ItemId::new(1),
            requested: 2,
            available: 1,
        });

        let err = coordinator.execute(request("k1")).await.unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Inventory(InventoryError::InsufficientStock { .. })
        ));
        assert_eq!(inventory.reserve_calls(), 1);
        assert_eq!(store.status(&IdempotencyKey::new("k1")).await, None);
    }

    #[tokio::test]
    async fn test_payment_failure_releases_reservation() {
        let (coordinator, inventory, payment, store) = setup();
        payment.fail_with(PaymentError::Declined("card".into()));

        let err = coordinator.execute(request("k1")).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Payment(PaymentError::Declined(_))));
        assert_eq!(inventory.release_calls(), vec![ReservationId::new(5)]);
        assert!(inventory.complete_calls().is_empty());
        assert_eq!(store.status(&IdempotencyKey::new("k1")).await, None);
    }

    #[tokio::test]
    async fn test_payment_failure_keeps_charge_error_when_release_fails() {
        let (coordinator, inventory, payment, _) = setup();
        payment.fail_with(PaymentError::Declined("card".into()));
        inventory.fail_release(InventoryError::Conflict("completed".into()));

        let err = coordinator.execute(request("k1")).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Payment(_)));
        assert_eq!(inventory.release_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_transient_payment_failure_is_not_retried() {
        for failure in [
            PaymentError::Network("reset".into()),
            PaymentError::Timeout("gateway slow".into()),
        ] {
            let (coordinator, inventory, payment, store) = setup();
            payment.fail_with(failure.clone());

            let err = coordinator.execute(request("k1")).await.unwrap_err();

            assert!(matches!(err, CheckoutError::Payment(ref e) if *e == failure));
            assert_eq!(payment.charges().len(), 1);
            assert_eq!(inventory.release_calls(), vec![ReservationId::new(5)]);
            assert!(inventory.complete_calls().is_empty());
            assert_eq!(store.status(&IdempotencyKey::new("k1")).await, None);
        }
    }

    #[tokio::test]
    async fn test_complete_failure_releases_reservation() {
        let (coordinator, inventory, _, store) = setup();
        inventory.fail_complete(InventoryError::Timeout("slow".into()));

        let err = coordinator.execute(request("k1")).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Inventory(InventoryError::Timeout(_))));
        assert_eq!(inventory.complete_calls().len(), 5);
        assert_eq!(inventory.release_calls(), vec![ReservationId::new(5)]);
        assert_eq!(store.status(&IdempotencyKey::new("k1")).await, None);
    }

    #[tokio::test]
    async fn test_compensation_failure_is_surfaced() {
        let (coordinator, inventory, _, store) = setup();
        inventory.fail_complete(InventoryError::Conflict("canceled".into()));
        inventory.fail_release(InventoryError::Network("down".into()));

        let err = coordinator.execute(request("k1")).await.unwrap_err();

        assert!(err.is_compensation_failure());
        match err {
            CheckoutError::CompensationFailed {
                reservation_id,
                failed_step,
                source,
            } => {
                assert_eq!(reservation_id, ReservationId::new(5));
                assert_eq!(failed_step, steps::STEP_COMPLETE_RESERVATION);
                assert_eq!(source, InventoryError::Network("down".into()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(inventory.complete_calls().len(), 1);
        assert_eq!(inventory.release_calls().len(), 5);
        assert_eq!(store.status(&IdempotencyKey::new("k1")).await, None);
    }

    #[tokio::test]
    async fn test_cancelled_context_has_no_side_effects() {
        let (coordinator, inventory, payment, store) = setup();
        let ctx = Context::background();
        ctx.cancel();

        let err = coordinator.checkout(&ctx, request("k1")).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Cancelled(ContextError::Cancelled)));
        assert_eq!(inventory.reserve_calls(), 0);
        assert!(payment.charges().is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_requests_are_rejected() {
        let (coordinator, inventory, _, store) = setup();

        let err = coordinator.execute(request("")).await.unwrap_err();
        assert!(matches!(err, CheckoutError::MissingIdempotencyKey));

        let err = coordinator
            .execute(CheckoutRequest::new(ItemId::new(1), 0, "k1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidQuantity { quantity: 0 }));

        assert_eq!(inventory.reserve_calls(), 0);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_key_can_be_retried() {
        let (coordinator, inventory, payment, store) = setup();
        payment.fail_with(PaymentError::Network("reset".into()));
        coordinator.execute(request("k1")).await.unwrap_err();

        *payment.error.lock().unwrap() = None;
        let receipt = coordinator.execute(request("k1")).await.unwrap();

        assert_eq!(receipt.reservation_id, ReservationId::new(5));
        assert_eq!(inventory.reserve_calls(), 2);
        assert_eq!(
            store.status(&IdempotencyKey::new("k1")).await,
            Some(RecordStatus::Succeeded)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcome_recorded_after_deadline() {
        let inventory = ScriptedInventory::new(5, Money::from_dollars(20));
        inventory.fail_reserve(InventoryError::Network("503".into()));
        let store = InMemoryIdempotencyStore::new();
        let coordinator = CheckoutCoordinator::new(
            inventory.clone(),
            RecordingPayment::default(),
            store.clone(),
        )
        .with_timeout(Duration::from_millis(1500));

        let err = coordinator.execute(request("k1")).await.unwrap_err();

        assert!(err.is_cancellation());
        assert_eq!(inventory.reserve_calls(), 2);
        assert_eq!(store.status(&IdempotencyKey::new("k1")).await, None);
    }
}
