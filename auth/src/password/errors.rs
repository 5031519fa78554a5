use thiserror::Error;

/// Failures of the hashing primitive itself. A wrong password is not an
/// error; `PasswordHasher::verify` reports it as `Ok(false)`.
#[derive(Debug, Clone, Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("Invalid Argon2 parameters: {0}")]
    InvalidParameters(String),
}
