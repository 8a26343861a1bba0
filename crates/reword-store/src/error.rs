//! Error types for reword storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("not found")]
    NotFound,

    /// The invited user was already referred or already has an account.
    #[error("user already referred: {user_id}")]
    AlreadyReferred {
        /// The invited user's id.
        user_id: String,
    },

    /// A user attempted to redeem their own invite code.
    #[error("self referral rejected: {user_id}")]
    SelfReferral {
        /// The offending user's id.
        user_id: String,
    },
}
