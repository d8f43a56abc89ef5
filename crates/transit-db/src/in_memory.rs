//! In-memory implementations of the repository traits
//!
//! Rows live in concurrent maps and are lost on restart. Suitable for
//! tests and single-process embedded runs; deployments use the
//! PostgreSQL implementations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Channel, Task, TaskStatus, User, UserApiKey};
use crate::repository::{ChannelRepository, TaskRepository, UserApiKeyRepository, UserRepository};

#[derive(Clone, Default)]
pub struct InMemoryChannelRepository {
    rows: Arc<RwLock<HashMap<Uuid, Channel>>>,
}

impl InMemoryChannelRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_channels(rows: impl Iterator<Item = Channel>) -> Vec<Channel> {
    let mut channels: Vec<Channel> = rows.collect();
    channels.sort_by_key(|c| (c.created_at, c.id));
    channels
}

#[async_trait]
impl ChannelRepository for InMemoryChannelRepository {
    async fn create(&self, channel: &Channel) -> Result<()> {
        self.rows.write().insert(channel.id, channel.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Channel>> {
        Ok(self.rows.read().get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Channel>> {
        Ok(sorted_channels(self.rows.read().values().cloned()))
    }

    async fn list_active(&self) -> Result<Vec<Channel>> {
        Ok(sorted_channels(
            self.rows.read().values().filter(|c| c.is_active).cloned(),
        ))
    }

    async fn update(&self, channel: &Channel) -> Result<()> {
        let mut updated = channel.clone();
        updated.updated_at = Utc::now();
        self.rows.write().insert(channel.id, updated);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.rows.write().remove(&id);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTaskRepository {
    rows: Arc<RwLock<HashMap<Uuid, Task>>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, task: &Task) -> Result<()> {
        self.rows.write().insert(task.id, task.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.rows.read().get(&id).cloned())
    }

    async fn mark_terminal(&self, id: Uuid, status: TaskStatus, result_url: Option<String>) -> Result<()> {
        let mut rows = self.rows.write();
        if let Some(task) = rows.get_mut(&id)
            && task.status == TaskStatus::Running
        {
            task.status = status;
            task.result_url = result_url;
            task.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_running(&self, limit: i64) -> Result<Vec<Task>> {
        let mut running: Vec<Task> = self
            .rows
            .read()
            .values()
            .filter(|t| t.status == TaskStatus::Running)
            .cloned()
            .collect();
        running.sort_by_key(|t| t.created_at);
        running.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(running)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    rows: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: &User) -> Result<()> {
        self.rows.write().insert(user.id, user.clone());
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.rows.read().get(&id).cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUserApiKeyRepository {
    rows: Arc<RwLock<Vec<UserApiKey>>>,
}

impl InMemoryUserApiKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserApiKeyRepository for InMemoryUserApiKeyRepository {
    async fn create(&self, key: &UserApiKey) -> Result<()> {
        self.rows.write().push(key.clone());
        Ok(())
    }

    async fn find_by_key(&self, api_key: &str) -> Result<Option<UserApiKey>> {
        Ok(self.rows.read().iter().find(|k| k.api_key == api_key).cloned())
    }
}
