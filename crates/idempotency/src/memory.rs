//! In-process idempotency store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{Context, IdempotencyKey};
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::{IdempotencyError, Result};
use crate::record::{DEFAULT_TTL, IdempotencyRecord, RecordStatus};
use crate::store::{Claim, IdempotencyStore};

#[derive(Debug, Clone)]
struct Entry {
    record: IdempotencyRecord,
    written_at: Instant,
}

/// Idempotency store backed by a map behind a lock.
///
/// Records expire after the retention period, measured from their last
/// write. Expiry is applied lazily when a key is looked up. Clones share the
/// same map.
#[derive(Debug, Clone)]
pub struct InMemoryIdempotencyStore {
    entries: Arc<RwLock<HashMap<IdempotencyKey, Entry>>>,
    retention: Duration,
}

impl InMemoryIdempotencyStore {
    /// Creates an empty store with the default 24 hour retention.
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_TTL)
    }

    /// Creates an empty store that forgets records after `retention`.
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// Returns the live status of a key, if any.
    pub async fn status(&self, key: &IdempotencyKey) -> Option<RecordStatus> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| !self.is_expired(entry))
            .map(|entry| entry.record.status)
    }

    /// Number of live records.
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|e| !self.is_expired(e)).count()
    }

    /// Returns true if no live records are held.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        entry.written_at.elapsed() >= self.retention
    }

    fn entry(record: IdempotencyRecord) -> Entry {
        Entry {
            record,
            written_at: Instant::now(),
        }
    }
}

impl Default for InMemoryIdempotencyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    #[tracing::instrument(skip(self, ctx), fields(key = %key))]
    async fn reserve_key(&self, ctx: &Context, key: &IdempotencyKey) -> Result<Claim> {
        ctx.check()?;

        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(key).filter(|e| !self.is_expired(e)) {
            match (existing.record.status, existing.record.replay_value()) {
                (RecordStatus::Succeeded, Some(cached)) => {
                    tracing::debug!("replaying stored result");
                    return Ok(Claim::Replay(cached));
                }
                (RecordStatus::Succeeded, None) => {
                    tracing::warn!("replacing succeeded record without a result");
                }
                (RecordStatus::Processing, _) => {
                    return Err(IdempotencyError::InFlight { key: key.clone() });
                }
            }
        }

        entries.insert(key.clone(), Self::entry(IdempotencyRecord::processing()));
        tracing::debug!("key claimed");
        Ok(Claim::Claimed)
    }

    #[tracing::instrument(skip(self, ctx), fields(key = %key))]
    async fn mark_failure(&self, ctx: &Context, key: &IdempotencyKey) -> Result<()> {
        ctx.check()?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    #[tracing::instrument(skip(self, ctx, result), fields(key = %key))]
    async fn mark_success(
        &self,
        ctx: &Context,
        key: &IdempotencyKey,
        result: serde_json::Value,
    ) -> Result<()> {
        ctx.check()?;
        self.entries
            .write()
            .await
            .insert(key.clone(), Self::entry(IdempotencyRecord::succeeded(result)));
        Ok(())
    }
}
