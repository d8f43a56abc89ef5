pub type Result<T> = std::result::Result<T, DbError>;

/// Errors from the durable store
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Query or connection failure
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Schema migration failure at startup
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be mapped back to a domain type
    #[error("invalid row data: {0}")]
    Decode(String),
}
