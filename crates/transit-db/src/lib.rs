#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

//! Durable records: channels, users, API keys, and async task rows
//!
//! Repository traits with a PostgreSQL implementation for deployments
//! and an in-memory twin for tests and embedded runs.

mod error;
pub mod in_memory;
mod models;
pub mod postgres;
mod repository;

pub use error::{DbError, Result};
pub use models::{Channel, Task, TaskKind, TaskStatus, User, UserApiKey, UserStatus};
pub use repository::{ChannelRepository, TaskRepository, UserApiKeyRepository, UserRepository};
