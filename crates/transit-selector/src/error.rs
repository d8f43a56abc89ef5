use transit_db::DbError;

/// Why no channel could be handed out
#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    /// No channel is configured and active
    #[error("no active channels")]
    NoActiveChannels,

    /// Every active channel is at its concurrency cap
    #[error("all channels are at capacity")]
    AllAtCapacity,

    /// The channel list could not be loaded
    #[error(transparent)]
    Repository(#[from] DbError),
}
