use transit_store::StoreError;

/// Errors from billing operations
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// The user's balance does not cover the requested deduction
    #[error("insufficient balance")]
    InsufficientBalance,

    /// Zero or negative amount passed to an operation requiring a
    /// strictly positive one
    #[error("amount must be positive, got {0}")]
    InvalidAmount(f64),

    /// The balance store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}
