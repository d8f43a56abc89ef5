use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

/// In-memory admission counters
///
/// Implements the same check-then-increment semantics as the Redis Lua
/// script, with the mutex providing the per-process atomicity.
#[derive(Clone, Default)]
pub struct MemoryAdmission {
    counters: Arc<Mutex<HashMap<Uuid, i64>>>,
}

impl MemoryAdmission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, channel_id: Uuid, max: i32) -> bool {
        let mut counters = self.counters.lock();
        let current = counters.entry(channel_id).or_insert(0);
        if *current < i64::from(max) {
            *current += 1;
            true
        } else {
            false
        }
    }

    pub fn release(&self, channel_id: Uuid) {
        let mut counters = self.counters.lock();
        if let Some(current) = counters.get_mut(&channel_id)
            && *current > 0
        {
            *current -= 1;
        }
    }

    pub fn in_flight(&self, channel_id: Uuid) -> i64 {
        self.counters.lock().get(&channel_id).copied().unwrap_or(0)
    }
}
