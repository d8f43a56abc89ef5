use redis::AsyncCommands;
use uuid::Uuid;

use super::counter_key;
use crate::error::StoreError;

/// Checks the current count against the cap and increments in one
/// round trip, so concurrent acquirers across processes cannot both
/// take the last slot.
const ACQUIRE_SCRIPT: &str = r"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
local max = tonumber(ARGV[1])
if current < max then
    redis.call('INCR', KEYS[1])
    return 1
end
return 0
";

/// Decrements only a positive counter. A missing or zero counter stays
/// at zero, which makes releases after a store restart a no-op.
const RELEASE_SCRIPT: &str = r"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
if current > 0 then
    redis.call('DECR', KEYS[1])
end
return 0
";

/// Redis-backed admission counters
#[derive(Clone)]
pub struct RedisAdmission {
    client: redis::Client,
}

impl RedisAdmission {
    pub fn new(url: &str) -> Result<Self, StoreError> {
        Ok(Self {
            client: redis::Client::open(url)?,
        })
    }

    pub async fn acquire(&self, channel_id: Uuid, max: i32) -> Result<bool, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let acquired: i64 = redis::Script::new(ACQUIRE_SCRIPT)
            .key(counter_key(channel_id))
            .arg(max)
            .invoke_async(&mut conn)
            .await?;
        Ok(acquired == 1)
    }

    pub async fn release(&self, channel_id: Uuid) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(counter_key(channel_id))
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }

    pub async fn in_flight(&self, channel_id: Uuid) -> Result<i64, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let current: Option<i64> = conn.get(counter_key(channel_id)).await?;
        Ok(current.unwrap_or(0))
    }
}
