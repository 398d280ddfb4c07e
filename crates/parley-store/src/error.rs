use thiserror::Error;

/// Errors surfaced by the file-backed stores.
///
/// Validation, duplicate, credential, ownership, and lookup failures are
/// caller errors. `Io` and `Corrupt` mean the on-disk document could not be
/// read or replaced; there is no retry layer underneath, so they are fatal
/// for the request that hit them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("a user with that name already exists")]
    DuplicateUser,

    /// Covers both an unknown username and a wrong password so callers
    /// cannot probe which usernames exist.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("you can only delete your own messages")]
    Forbidden,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store document corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
