use redis::AsyncCommands;
use uuid::Uuid;

use super::balance_key;
use crate::error::StoreError;

/// Compares the balance against the amount and decrements in one round
/// trip. The decrement runs through INCRBYFLOAT so the stored value
/// stays a decimal string.
const DEDUCT_SCRIPT: &str = r"
local balance = tonumber(redis.call('GET', KEYS[1]) or '0')
local amount = tonumber(ARGV[1])
if balance >= amount then
    redis.call('INCRBYFLOAT', KEYS[1], -amount)
    return 1
end
return 0
";

/// Redis-backed balances
#[derive(Clone)]
pub struct RedisBalance {
    client: redis::Client,
}

impl RedisBalance {
    pub fn new(url: &str) -> Result<Self, StoreError> {
        Ok(Self {
            client: redis::Client::open(url)?,
        })
    }

    pub async fn deduct(&self, user_id: Uuid, amount: f64) -> Result<bool, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let deducted: i64 = redis::Script::new(DEDUCT_SCRIPT)
            .key(balance_key(user_id))
            .arg(amount)
            .invoke_async(&mut conn)
            .await?;
        Ok(deducted == 1)
    }

    pub async fn incr(&self, user_id: Uuid, delta: f64) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: f64 = conn.incr(balance_key(user_id), delta).await?;
        Ok(())
    }

    pub async fn read(&self, user_id: Uuid) -> Result<f64, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let balance: Option<f64> = conn.get(balance_key(user_id)).await?;
        Ok(balance.unwrap_or(0.0))
    }
}
