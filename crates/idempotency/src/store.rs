use async_trait::async_trait;
use common::{Context, IdempotencyKey};

use crate::Result;

/// Outcome of claiming a token.
#[derive(Debug, Clone, PartialEq)]
pub enum Claim {
    /// The token was free and now belongs to the caller, which must later
    /// call either `mark_success` or `mark_failure`.
    Claimed,
    /// The token already completed; here is its cached result.
    Replay(serde_json::Value),
}

/// Core trait for idempotency store implementations.
///
/// Claims for a single token must be linearizable: of any number of
/// concurrent `reserve_key` calls for a fresh token, exactly one observes
/// [`Claim::Claimed`]. The rest see
/// [`IdempotencyError::InFlight`](crate::IdempotencyError::InFlight) until the
/// owner finishes, or [`Claim::Replay`] afterwards.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Claims a token for processing.
    ///
    /// Fails with `InFlight` if another attempt currently owns the token.
    async fn reserve_key(&self, ctx: &Context, key: &IdempotencyKey) -> Result<Claim>;

    /// Forgets the token so a later request with it can try again.
    async fn mark_failure(&self, ctx: &Context, key: &IdempotencyKey) -> Result<()>;

    /// Records that the token completed, caching `result` for replay.
    async fn mark_success(
        &self,
        ctx: &Context,
        key: &IdempotencyKey,
        result: serde_json::Value,
    ) -> Result<()>;
}
