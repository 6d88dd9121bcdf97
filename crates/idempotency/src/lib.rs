//! Idempotency-key store for at-most-once request execution.
//!
//! A client-supplied token is claimed before any side effect runs. The
//! record moves through:
//!
//! ```text
//! (absent) ──claim──► Processing ──success──► Succeeded (replayable)
//!                         │
//!                         └──failure──► (absent, claimable again)
//! ```
//!
//! Two backends implement [`IdempotencyStore`]: [`InMemoryIdempotencyStore`]
//! for single-process deployments and tests, and [`RedisIdempotencyStore`]
//! for durable, shared storage with a per-key TTL.

pub mod error;
pub mod memory;
pub mod record;
pub mod redis_store;
pub mod store;

pub use error::{IdempotencyError, Result};
pub use memory::InMemoryIdempotencyStore;
pub use record::{DEFAULT_TTL, IdempotencyRecord, KEY_PREFIX, RecordStatus};
pub use redis_store::RedisIdempotencyStore;
pub use store::{Claim, IdempotencyStore};
