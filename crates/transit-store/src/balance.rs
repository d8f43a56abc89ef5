mod memory;
mod redis;

use uuid::Uuid;

use crate::error::StoreError;
pub use memory::MemoryBalance;
pub use redis::RedisBalance;

/// Per-user monetary balances with an atomic check-and-decrement
///
/// Values carry 4 fractional digits of significance and are mutated
/// only through `deduct` (conditional) and `incr` (unconditional).
#[derive(Clone)]
pub enum BalanceStore {
    Memory(MemoryBalance),
    Redis(RedisBalance),
}

impl BalanceStore {
    /// Create an in-memory store (tests and embedded runs)
    pub fn in_memory() -> Self {
        Self::Memory(MemoryBalance::new())
    }

    /// Create a Redis-backed store
    pub fn redis(url: &str) -> Result<Self, StoreError> {
        Ok(Self::Redis(RedisBalance::new(url)?))
    }

    /// Atomically decrement when the balance covers `amount`
    ///
    /// Returns `false`, without modification, when funds are short.
    pub async fn deduct(&self, user_id: Uuid, amount: f64) -> Result<bool, StoreError> {
        match self {
            Self::Memory(m) => Ok(m.deduct(user_id, amount)),
            Self::Redis(r) => r.deduct(user_id, amount).await,
        }
    }

    /// Unconditional signed addition (refunds, recharges, metered deductions)
    pub async fn incr(&self, user_id: Uuid, delta: f64) -> Result<(), StoreError> {
        match self {
            Self::Memory(m) => {
                m.incr(user_id, delta);
                Ok(())
            }
            Self::Redis(r) => r.incr(user_id, delta).await,
        }
    }

    /// Current balance; a missing key reads zero
    pub async fn read(&self, user_id: Uuid) -> Result<f64, StoreError> {
        match self {
            Self::Memory(m) => Ok(m.read(user_id)),
            Self::Redis(r) => r.read(user_id).await,
        }
    }
}

/// Balance key for one user
pub(crate) fn balance_key(user_id: Uuid) -> String {
    format!("transit:user:{user_id}:balance")
}
