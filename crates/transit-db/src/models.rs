use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use uuid::Uuid;

/// One credentialed upstream provider account
///
/// The live in-flight count is never persisted here; it is read from
/// the admission store and joined on admin queries.
#[derive(Debug, Clone)]
pub struct Channel {
    pub id: Uuid,
    pub name: String,
    pub secret_key: SecretString,
    pub base_url: String,
    pub max_concurrency: i32,
    pub weight: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Channel {
    pub fn new(
        name: String,
        secret_key: SecretString,
        base_url: String,
        max_concurrency: i32,
        weight: i32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            secret_key,
            base_url,
            max_concurrency,
            weight,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Account status for a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Disabled,
}

impl UserStatus {
    pub const fn as_i16(self) -> i16 {
        match self {
            Self::Active => 1,
            Self::Disabled => 0,
        }
    }

    pub const fn from_i16(value: i16) -> Self {
        match value {
            0 => Self::Disabled,
            _ => Self::Active,
        }
    }
}

/// Owner of funds and API keys; the balance itself lives in the
/// balance store to keep monetary updates atomic
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            status: UserStatus::Active,
            created_at: Utc::now(),
        }
    }
}

/// Opaque bearer token bound to a user
#[derive(Debug, Clone)]
pub struct UserApiKey {
    pub id: Uuid,
    pub user_id: Uuid,
    pub api_key: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl UserApiKey {
    pub fn new(user_id: Uuid, api_key: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            api_key,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

/// How a task is settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Sync,
    Async,
}

impl TaskKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Async => "async",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sync" => Some(Self::Sync),
            "async" => Some(Self::Async),
            _ => None,
        }
    }
}

/// Lifecycle state of an async job
///
/// Tasks start `running` and move to exactly one terminal state; there
/// are no reverse transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Record of one async job
///
/// While a task is `running` it accounts for exactly one channel slot
/// and exactly `cost` held against the user's balance. Created at
/// submission, mutated only by the poller, never deleted.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub channel_id: Uuid,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub model_name: String,
    pub upstream_task_id: String,
    pub status: TaskStatus,
    pub cost: f64,
    pub result_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// A freshly submitted async job holding `cost` against its user
    pub fn submitted(
        user_id: Uuid,
        channel_id: Uuid,
        model_name: String,
        upstream_task_id: String,
        cost: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            channel_id,
            kind: TaskKind::Async,
            model_name,
            upstream_task_id,
            status: TaskStatus::Running,
            cost,
            result_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}
