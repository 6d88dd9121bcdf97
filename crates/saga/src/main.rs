//! Runs one checkout against an in-process ledger.
//!
//! ```bash
//! checkout <quantity> [idempotency-key]
//! ```
//!
//! The ledger is seeded with item 1 (price $10.00, stock 10). The
//! idempotency store is Redis when `REDIS_URL` is set, in-memory otherwise.

use common::{IdempotencyKey, ItemId, Money};
use idempotency::{IdempotencyStore, InMemoryIdempotencyStore, RedisIdempotencyStore};
use inventory::{Item, ReservationLedger};
use saga::{
    CheckoutConfig, CheckoutCoordinator, CheckoutRequest, InMemoryPaymentGateway,
    LedgerInventoryGateway,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const DEMO_ITEM: ItemId = ItemId::new(1);

async fn run<K: IdempotencyStore + 'static>(
    store: K,
    config: &CheckoutConfig,
    request: CheckoutRequest,
) -> Result<(), BoxError> {
    let ledger = ReservationLedger::with_items([Item::new(DEMO_ITEM, Money::from_dollars(10), 10)]);
    let coordinator = CheckoutCoordinator::from_config(
        LedgerInventoryGateway::new(ledger.clone()),
        InMemoryPaymentGateway::new(),
        store,
        config,
    );

    let receipt = coordinator.execute(request).await?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);

    let available = ledger.available_stock(DEMO_ITEM).await?;
    tracing::info!(available, "stock after checkout");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // 1. Load configuration and initialize tracing
    let config = CheckoutConfig::from_env();
    saga::telemetry::init(&config);

    // 2. Parse arguments
    let mut args = std::env::args().skip(1);
    let quantity: u32 = match args.next() {
        Some(raw) => raw.parse()?,
        None => 1,
    };
    let key = args
        .next()
        .map(IdempotencyKey::new)
        .unwrap_or_else(IdempotencyKey::generate);
    let request = CheckoutRequest::new(DEMO_ITEM, quantity, key);

    // 3. Pick the idempotency backend and run
    match &config.redis_url {
        Some(url) => {
            tracing::info!("using Redis idempotency store");
            run(RedisIdempotencyStore::new(url).await?, &config, request).await
        }
        None => run(InMemoryIdempotencyStore::new(), &config, request).await,
    }
}
