use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix prepended to every token when it is stored in Redis.
pub const KEY_PREFIX: &str = "idempotency:checkout:";

/// How long a record is retained after its last write.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Processing state of an idempotency token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// An attempt owns the token and has not finished.
    Processing,
    /// The operation completed; the cached result is returned on replay.
    Succeeded,
}

impl RecordStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Processing => "processing",
            RecordStatus::Succeeded => "succeeded",
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stored state for one token.
///
/// Persisted as JSON: `{"status": "...", "result": ..., "updated_at": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    /// A freshly claimed record.
    pub fn processing() -> Self {
        Self {
            status: RecordStatus::Processing,
            result: None,
            updated_at: Utc::now(),
        }
    }

    /// A completed record caching `result` for replay.
    pub fn succeeded(result: serde_json::Value) -> Self {
        Self {
            status: RecordStatus::Succeeded,
            result: Some(result),
            updated_at: Utc::now(),
        }
    }

    /// Decodes a stored record.
    ///
    /// Returns `None` when the bytes are not a well-formed record, including
    /// records carrying a status other than `processing` or `succeeded` and
    /// `succeeded` records with no cached result.
    pub fn decode(raw: &[u8]) -> Option<Self> {
        serde_json::from_slice::<Self>(raw)
            .ok()
            .filter(|record| record.status != RecordStatus::Succeeded || record.result.is_some())
    }

    /// The cached result of a completed record. `None` while processing.
    pub fn replay_value(&self) -> Option<serde_json::Value> {
        match self.status {
            RecordStatus::Succeeded => self.result.clone(),
            RecordStatus::Processing => None,
        }
    }
}
