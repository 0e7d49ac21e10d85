//! Read-confirm loop used before tagging freshly written objects.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StorageError;

use super::{ObjectStore, Tag};

/// Bounded exponential backoff for visibility polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlePolicy {
    pub max_attempts: u32,
    #[serde(with = "millis")]
    pub initial_delay: Duration,
    #[serde(with = "millis")]
    pub max_delay: Duration,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl SettlePolicy {
    /// Policy that polls without sleeping, for in-process stores.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before poll number `attempt` (0-based, first poll has none).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Polls `exists` until the object is visible or the policy is exhausted.
///
/// Returns the number of polls it took.
pub fn wait_until_visible(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    policy: &SettlePolicy,
) -> Result<u32, StorageError> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 0..attempts {
        let delay = policy.delay_for(attempt);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if store.exists(bucket, key)? {
            debug!(key = %key, polls = attempt + 1, "object visible");
            return Ok(attempt + 1);
        }
    }

    warn!(key = %key, attempts, "object never became visible");
    Err(StorageError::NotVisible {
        bucket: bucket.to_string(),
        key: key.to_string(),
        attempts,
    })
}

/// Waits for visibility, then replaces the object's tag set.
pub fn tag_when_visible(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    tags: &[Tag],
    policy: &SettlePolicy,
) -> Result<(), StorageError> {
    wait_until_visible(store, bucket, key, policy)?;
    store.put_tags(bucket, key, tags)
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
