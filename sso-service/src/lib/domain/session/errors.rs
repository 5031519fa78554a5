use std::fmt;

use thiserror::Error;

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Errors reported by a `SessionStore` or `UnitOfWork`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    /// The transaction lost a race with a concurrent one and was aborted.
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Stable classification of an `AuthError`, for transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Unauthenticated,
    Conflict,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Top-level error for Register, Login and RefreshTokens.
///
/// Messages never say which credential was wrong.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Refresh token not found")]
    RefreshTokenNotFound,

    #[error("Email already registered: {0}")]
    EmailAlreadyExists(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Refresh token is revoked or expired")]
    InvalidRefreshToken,

    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::RefreshTokenNotFound => ErrorKind::NotFound,
            AuthError::EmailAlreadyExists(_) => ErrorKind::AlreadyExists,
            AuthError::InvalidCredentials | AuthError::InvalidRefreshToken => {
                ErrorKind::Unauthenticated
            }
            AuthError::Conflict(_) => ErrorKind::Conflict,
            AuthError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Default classification for store failures that the orchestrator has no
/// more specific meaning for. A missing row at this point is a broken
/// reference, not a caller mistake.
impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => AuthError::Conflict(msg),
            StoreError::NotFound(msg) => {
                AuthError::Internal(format!("data integrity violation: {}", msg))
            }
            StoreError::AlreadyExists(msg) | StoreError::Database(msg) => {
                AuthError::Internal(msg)
            }
        }
    }
}

impl From<auth::TokenError> for AuthError {
    fn from(err: auth::TokenError) -> Self {
        AuthError::Internal(format!("token issuing failed: {}", err))
    }
}

impl From<auth::PasswordError> for AuthError {
    fn from(err: auth::PasswordError) -> Self {
        AuthError::Internal(format!("password hashing failed: {}", err))
    }
}
