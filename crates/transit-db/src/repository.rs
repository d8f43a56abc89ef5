use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Channel, Task, TaskStatus, User, UserApiKey};

/// Durable channel records
#[async_trait]
pub trait ChannelRepository: Send + Sync {
    async fn create(&self, channel: &Channel) -> Result<()>;

    async fn find(&self, id: Uuid) -> Result<Option<Channel>>;

    async fn list_all(&self) -> Result<Vec<Channel>>;

    /// Active channels in stable (creation) order, as the weighted pick
    /// walks them
    async fn list_active(&self) -> Result<Vec<Channel>>;

    async fn update(&self, channel: &Channel) -> Result<()>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Durable async-task records
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: &Task) -> Result<()>;

    async fn find(&self, id: Uuid) -> Result<Option<Task>>;

    /// Move a running task into a terminal state
    ///
    /// Tasks the poller has already settled are excluded from
    /// `list_running`, so a terminal row is never transitioned again.
    async fn mark_terminal(&self, id: Uuid, status: TaskStatus, result_url: Option<String>) -> Result<()>;

    /// Up to `limit` running tasks, oldest first (FIFO reconciliation)
    async fn list_running(&self, limit: i64) -> Result<Vec<Task>>;
}

/// Durable user records
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<()>;

    async fn find(&self, id: Uuid) -> Result<Option<User>>;
}

/// Bearer-token lookup
#[async_trait]
pub trait UserApiKeyRepository: Send + Sync {
    async fn create(&self, key: &UserApiKey) -> Result<()>;

    async fn find_by_key(&self, api_key: &str) -> Result<Option<UserApiKey>>;
}
