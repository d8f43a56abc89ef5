use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

/// In-memory balances mirroring the Redis conditional-deduct semantics
#[derive(Clone, Default)]
pub struct MemoryBalance {
    balances: Arc<Mutex<HashMap<Uuid, f64>>>,
}

impl MemoryBalance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deduct(&self, user_id: Uuid, amount: f64) -> bool {
        let mut balances = self.balances.lock();
        let balance = balances.entry(user_id).or_insert(0.0);
        if *balance >= amount {
            *balance -= amount;
            true
        } else {
            false
        }
    }

    pub fn incr(&self, user_id: Uuid, delta: f64) {
        let mut balances = self.balances.lock();
        *balances.entry(user_id).or_insert(0.0) += delta;
    }

    pub fn read(&self, user_id: Uuid) -> f64 {
        self.balances.lock().get(&user_id).copied().unwrap_or(0.0)
    }
}
