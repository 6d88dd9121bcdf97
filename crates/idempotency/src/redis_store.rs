//! Redis-backed idempotency store.
//!
//! # Key Format
//!
//! `idempotency:checkout:{token}` → JSON-serialized [`IdempotencyRecord`],
//! written with a TTL on every write (24 hours by default).
//!
//! # Atomicity
//!
//! - **Claim**: `SET key value NX EX ttl`, so of many concurrent claims for a
//!   fresh key exactly one wins.
//! - **Unreadable records**: replaced by a Lua compare-and-set that only
//!   fires if the stored bytes are still the unreadable ones we observed.
//! - **Success**: `SET key value EX ttl`, overwriting the processing record.
//! - **Failure**: `DEL key`.

use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use common::{Context, IdempotencyKey};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};

use crate::error::{IdempotencyError, Result};
use crate::record::{DEFAULT_TTL, IdempotencyRecord, KEY_PREFIX};
use crate::store::{Claim, IdempotencyStore};

/// Replaces KEYS[1] with ARGV[2] (TTL ARGV[3] seconds) only if it still holds ARGV[1].
static REPLACE_IF_UNCHANGED: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('GET', KEYS[1]) == ARGV[1] then
            redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
            return 1
        end
        return 0
        ",
    )
});

/// Durable idempotency store shared by every process pointing at the same
/// Redis.
///
/// Cloning is cheap: clones share one `ConnectionManager`.
#[derive(Clone)]
pub struct RedisIdempotencyStore {
    conn_manager: ConnectionManager,
    ttl: Duration,
}

impl RedisIdempotencyStore {
    /// Connects to Redis at `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or the connection fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let conn_manager = ConnectionManager::new(client).await?;

        tracing::info!("RedisIdempotencyStore initialized");

        Ok(Self::from_connection_manager(conn_manager))
    }

    /// Wraps an existing connection manager.
    pub fn from_connection_manager(conn_manager: ConnectionManager) -> Self {
        Self {
            conn_manager,
            ttl: DEFAULT_TTL,
        }
    }

    /// Overrides the record TTL. Sub-second values round up to one second.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Redis key holding the record for `key`.
    pub fn record_key(key: &IdempotencyKey) -> String {
        format!("{KEY_PREFIX}{key}")
    }

    fn ttl_seconds(&self) -> u64 {
        self.ttl.as_secs().max(1)
    }

    fn encode(record: &IdempotencyRecord) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(record)?)
    }

    /// Awaits a Redis call unless the context finishes first.
    async fn run<T>(
        ctx: &Context,
        call: impl Future<Output = redis::RedisResult<T>>,
    ) -> Result<T> {
        ctx.check()?;
        tokio::select! {
            reason = ctx.done() => Err(reason.into()),
            result = call => Ok(result?),
        }
    }
}

impl std::fmt::Debug for RedisIdempotencyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisIdempotencyStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IdempotencyStore for RedisIdempotencyStore {
    #[tracing::instrument(skip(self, ctx), fields(key = %key))]
    async fn reserve_key(&self, ctx: &Context, key: &IdempotencyKey) -> Result<Claim> {
        let mut conn = self.conn_manager.clone();
        let record_key = Self::record_key(key);
        let processing = Self::encode(&IdempotencyRecord::processing())?;
        let ttl = self.ttl_seconds();

        loop {
            let raw: Option<Vec<u8>> = Self::run(ctx, conn.get(&record_key)).await?;

            let Some(raw) = raw else {
                let set: Option<String> = Self::run(
                    ctx,
                    redis::cmd("SET")
                        .arg(&record_key)
                        .arg(&processing)
                        .arg("NX")
                        .arg("EX")
                        .arg(ttl)
                        .query_async(&mut conn),
                )
                .await?;

                if set.is_some() {
                    tracing::debug!("key claimed");
                    metrics::counter!("idempotency_claims_total", "outcome" => "claimed")
                        .increment(1);
                    return Ok(Claim::Claimed);
                }
                // Lost the race to another claimant; look again.
                continue;
            };

            match IdempotencyRecord::decode(&raw).map(|record| record.replay_value()) {
                Some(Some(cached)) => {
                    tracing::debug!("replaying stored result");
                    metrics::counter!("idempotency_claims_total", "outcome" => "replay")
                        .increment(1);
                    return Ok(Claim::Replay(cached));
                }
                Some(None) => {
                    metrics::counter!("idempotency_claims_total", "outcome" => "in_flight")
                        .increment(1);
                    return Err(IdempotencyError::InFlight { key: key.clone() });
                }
                None => {
                    tracing::warn!("replacing unreadable idempotency record");
                    let mut invocation = REPLACE_IF_UNCHANGED.key(&record_key);
                    invocation.arg(&raw).arg(&processing).arg(ttl);
                    let replaced: i32 =
                        Self::run(ctx, invocation.invoke_async(&mut conn)).await?;

                    if replaced == 1 {
                        metrics::counter!("idempotency_claims_total", "outcome" => "claimed")
                            .increment(1);
                        return Ok(Claim::Claimed);
                    }
                }
            }
        }
    }

    #[tracing::instrument(skip(self, ctx), fields(key = %key))]
    async fn mark_failure(&self, ctx: &Context, key: &IdempotencyKey) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let record_key = Self::record_key(key);

        let _: () = Self::run(ctx, conn.del(&record_key)).await?;
        tracing::debug!("key released");
        Ok(())
    }

    #[tracing::instrument(skip(self, ctx, result), fields(key = %key))]
    async fn mark_success(
        &self,
        ctx: &Context,
        key: &IdempotencyKey,
        result: serde_json::Value,
    ) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let record_key = Self::record_key(key);
        let bytes = Self::encode(&IdempotencyRecord::succeeded(result))?;

        let _: () = Self::run(ctx, conn.set_ex(&record_key, bytes, self.ttl_seconds())).await?;
        tracing::debug!(ttl_seconds = self.ttl_seconds(), "result stored");
        Ok(())
    }
}
