use thiserror::Error;

/// Error type for token issuing and verification.
#[derive(Debug, Clone, Error)]
pub enum TokenError {
    #[error("Signing secret is empty")]
    EmptySecret,

    #[error("Failed to encode token: {0}")]
    EncodingFailed(String),

    #[error("Failed to decode token: {0}")]
    DecodingFailed(String),

    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token is expired")]
    Expired,

    #[error("Randomness source failed: {0}")]
    RandomnessUnavailable(String),
}
