mod memory;
mod redis;

use uuid::Uuid;

use crate::error::StoreError;
pub use memory::MemoryAdmission;
pub use redis::RedisAdmission;

/// Per-channel concurrency counters with a bounded atomic increment
///
/// The counter is the single source of truth for a channel's in-flight
/// count. Counters are volatile: after a store restart everything reads
/// zero, which is safe because releases clamp at zero and the poller
/// reconciles in-flight tasks.
#[derive(Clone)]
pub enum AdmissionStore {
    Memory(MemoryAdmission),
    Redis(RedisAdmission),
}

impl AdmissionStore {
    /// Create an in-memory store (tests and embedded runs)
    pub fn in_memory() -> Self {
        Self::Memory(MemoryAdmission::new())
    }

    /// Create a Redis-backed store
    pub fn redis(url: &str) -> Result<Self, StoreError> {
        Ok(Self::Redis(RedisAdmission::new(url)?))
    }

    /// Atomically reserve one slot if the channel is below `max`
    ///
    /// Returns `true` when the slot was acquired. Every `true` return
    /// obligates the caller to exactly one `release`.
    pub async fn acquire(&self, channel_id: Uuid, max: i32) -> Result<bool, StoreError> {
        match self {
            Self::Memory(m) => Ok(m.acquire(channel_id, max)),
            Self::Redis(r) => r.acquire(channel_id, max).await,
        }
    }

    /// Atomically return one slot; a missing or zero counter is left at zero
    pub async fn release(&self, channel_id: Uuid) -> Result<(), StoreError> {
        match self {
            Self::Memory(m) => {
                m.release(channel_id);
                Ok(())
            }
            Self::Redis(r) => r.release(channel_id).await,
        }
    }

    /// Current in-flight count; a missing counter reads zero
    pub async fn in_flight(&self, channel_id: Uuid) -> Result<i64, StoreError> {
        match self {
            Self::Memory(m) => Ok(m.in_flight(channel_id)),
            Self::Redis(r) => r.in_flight(channel_id).await,
        }
    }
}

/// Counter key for one channel
pub(crate) fn counter_key(channel_id: Uuid) -> String {
    format!("transit:channel:{channel_id}:concurrency")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_up_to_max_then_denies() {
        let store = AdmissionStore::in_memory();
        let channel = Uuid::new_v4();

        assert!(store.acquire(channel, 2).await.unwrap());
        assert!(store.acquire(channel, 2).await.unwrap());
        assert!(!store.acquire(channel, 2).await.unwrap());
        assert_eq!(store.in_flight(channel).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn release_frees_a_slot() {
        let store = AdmissionStore::in_memory();
        let channel = Uuid::new_v4();

        assert!(store.acquire(channel, 1).await.unwrap());
        assert!(!store.acquire(channel, 1).await.unwrap());

        store.release(channel).await.unwrap();
        assert!(store.acquire(channel, 1).await.unwrap());
    }

    #[tokio::test]
    async fn release_clamps_at_zero() {
        let store = AdmissionStore::in_memory();
        let channel = Uuid::new_v4();

        store.release(channel).await.unwrap();
        store.release(channel).await.unwrap();
        assert_eq!(store.in_flight(channel).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_counter_reads_zero() {
        let store = AdmissionStore::in_memory();
        assert_eq!(store.in_flight(Uuid::new_v4()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn channels_are_independent() {
        let store = AdmissionStore::in_memory();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(store.acquire(a, 1).await.unwrap());
        assert!(store.acquire(b, 1).await.unwrap());
        assert!(!store.acquire(a, 1).await.unwrap());

        store.release(a).await.unwrap();
        assert_eq!(store.in_flight(a).await.unwrap(), 0);
        assert_eq!(store.in_flight(b).await.unwrap(), 1);
    }
}
