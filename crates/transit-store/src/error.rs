/// Errors from the counter and balance stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connection or command failure against Redis
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}
