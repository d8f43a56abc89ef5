//! PostgreSQL implementations of the repository traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{DbError, Result};
use crate::models::{Channel, Task, TaskKind, TaskStatus, User, UserApiKey, UserStatus};
use crate::repository::{ChannelRepository, TaskRepository, UserApiKeyRepository, UserRepository};

/// Apply the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

// Row types keep sqlx decoding separate from the domain models, so
// secrets and enums only exist in their domain form outside this file.

#[derive(FromRow)]
struct ChannelRow {
    id: Uuid,
    name: String,
    secret_key: String,
    base_url: String,
    max_concurrency: i32,
    weight: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ChannelRow> for Channel {
    fn from(row: ChannelRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            secret_key: SecretString::from(row.secret_key),
            base_url: row.base_url,
            max_concurrency: row.max_concurrency,
            weight: row.weight,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct TaskRow {
    id: Uuid,
    user_id: Uuid,
    channel_id: Uuid,
    kind: String,
    model_name: String,
    upstream_task_id: String,
    status: String,
    cost: f64,
    result_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = DbError;

    fn try_from(row: TaskRow) -> Result<Self> {
        let kind = TaskKind::parse(&row.kind)
            .ok_or_else(|| DbError::Decode(format!("unknown task kind `{}`", row.kind)))?;
        let status = TaskStatus::parse(&row.status)
            .ok_or_else(|| DbError::Decode(format!("unknown task status `{}`", row.status)))?;
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            channel_id: row.channel_id,
            kind,
            model_name: row.model_name,
            upstream_task_id: row.upstream_task_id,
            status,
            cost: row.cost,
            result_url: row.result_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const CHANNEL_COLUMNS: &str =
    "id, name, secret_key, base_url, max_concurrency, weight, is_active, created_at, updated_at";

const TASK_COLUMNS: &str = "id, user_id, channel_id, kind, model_name, upstream_task_id, status, \
                            cost, result_url, created_at, updated_at";

#[derive(Clone)]
pub struct PgChannelRepository {
    pool: PgPool,
}

impl PgChannelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelRepository for PgChannelRepository {
    async fn create(&self, channel: &Channel) -> Result<()> {
        sqlx::query(
            "INSERT INTO channels (id, name, secret_key, base_url, max_concurrency, weight, \
             is_active, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(channel.id)
        .bind(&channel.name)
        .bind(channel.secret_key.expose_secret())
        .bind(&channel.base_url)
        .bind(channel.max_concurrency)
        .bind(channel.weight)
        .bind(channel.is_active)
        .bind(channel.created_at)
        .bind(channel.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Channel>> {
        let row = sqlx::query_as::<_, ChannelRow>(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Channel::from))
    }

    async fn list_all(&self) -> Result<Vec<Channel>> {
        let rows = sqlx::query_as::<_, ChannelRow>(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Channel::from).collect())
    }

    async fn list_active(&self) -> Result<Vec<Channel>> {
        let rows = sqlx::query_as::<_, ChannelRow>(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels WHERE is_active = true ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Channel::from).collect())
    }

    async fn update(&self, channel: &Channel) -> Result<()> {
        sqlx::query(
            "UPDATE channels SET name = $2, secret_key = $3, base_url = $4, max_concurrency = $5, \
             weight = $6, is_active = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(channel.id)
        .bind(&channel.name)
        .bind(channel.secret_key.expose_secret())
        .bind(&channel.base_url)
        .bind(channel.max_concurrency)
        .bind(channel.weight)
        .bind(channel.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM channels WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn create(&self, task: &Task) -> Result<()> {
        sqlx::query(
            "INSERT INTO tasks (id, user_id, channel_id, kind, model_name, upstream_task_id, \
             status, cost, result_url, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(task.id)
        .bind(task.user_id)
        .bind(task.channel_id)
        .bind(task.kind.as_str())
        .bind(&task.model_name)
        .bind(&task.upstream_task_id)
        .bind(task.status.as_str())
        .bind(task.cost)
        .bind(&task.result_url)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Task::try_from).transpose()
    }

    async fn mark_terminal(&self, id: Uuid, status: TaskStatus, result_url: Option<String>) -> Result<()> {
        sqlx::query(
            "UPDATE tasks SET status = $2, result_url = $3, updated_at = $4 \
             WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(result_url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_running(&self, limit: i64) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE status = 'running' \
             ORDER BY created_at ASC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Task::try_from).collect()
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    status: i16,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &User) -> Result<()> {
        sqlx::query("INSERT INTO users (id, username, status, created_at) VALUES ($1, $2, $3, $4)")
            .bind(user.id)
            .bind(&user.username)
            .bind(user.status.as_i16())
            .bind(user.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, status, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| User {
            id: r.id,
            username: r.username,
            status: UserStatus::from_i16(r.status),
            created_at: r.created_at,
        }))
    }
}

#[derive(Clone)]
pub struct PgUserApiKeyRepository {
    pool: PgPool,
}

impl PgUserApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserApiKeyRow {
    id: Uuid,
    user_id: Uuid,
    api_key: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl UserApiKeyRepository for PgUserApiKeyRepository {
    async fn create(&self, key: &UserApiKey) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_api_keys (id, user_id, api_key, is_active, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(key.id)
        .bind(key.user_id)
        .bind(&key.api_key)
        .bind(key.is_active)
        .bind(key.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_key(&self, api_key: &str) -> Result<Option<UserApiKey>> {
        let row = sqlx::query_as::<_, UserApiKeyRow>(
            "SELECT id, user_id, api_key, is_active, created_at FROM user_api_keys \
             WHERE api_key = $1",
        )
        .bind(api_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| UserApiKey {
            id: r.id,
            user_id: r.user_id,
            api_key: r.api_key,
            is_active: r.is_active,
            created_at: r.created_at,
        }))
    }
}
