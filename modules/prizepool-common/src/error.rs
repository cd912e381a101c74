/// Result type alias for prizepool operations.
pub type Result<T> = std::result::Result<T, PrizepoolError>;

#[derive(Debug, thiserror::Error)]
pub enum PrizepoolError {
    /// Bad user input (duration, price, ticket count). Surfaced to the
    /// invoking actor, never logged as a system fault.
    #[error("{0}")]
    Validation(String),

    /// Event or message missing. Surfaced, non-fatal.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Lost the atomic claim race — someone else finalized first.
    #[error("This event has already been finalized")]
    AlreadyFinalized,

    /// Persistent-store call failed. Logged with context; the single
    /// operation aborts, the surrounding loop continues.
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Messaging-platform call failed. Logged; the durable state change is
    /// never rolled back — the surface simply lags.
    #[error("Platform error: {0}")]
    Platform(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PrizepoolError {
    /// True for failures that are an answer to the actor, not a fault.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            PrizepoolError::Validation(_)
                | PrizepoolError::NotFound(_)
                | PrizepoolError::AlreadyFinalized
        )
    }
}
