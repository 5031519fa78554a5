use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;

use crate::password::PasswordError;
use crate::password::PasswordHasher;
use crate::token::generate_refresh_token;
use crate::token::AccessClaims;
use crate::token::AccessTokenIssuer;
use crate::token::TokenError;

/// Authentication coordinator combining credential checks and token minting.
#[derive(Debug, Clone)]
pub struct Authenticator {
    password_hasher: PasswordHasher,
    token_issuer: AccessTokenIssuer,
}

/// Identity an access/refresh pair is minted for.
#[derive(Debug, Clone, Copy)]
pub struct TokenSubject<'a> {
    pub user_id: &'a str,
    pub email: &'a str,
    pub app_id: i32,
    /// Signing secret of `app_id`
    pub app_secret: &'a [u8],
}

/// How long each half of a token pair stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// Authentication operation errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("Token error: {0}")]
    TokenError(#[from] TokenError),
}

impl Authenticator {
    pub fn new(password_hasher: PasswordHasher) -> Self {
        Self {
            password_hasher,
            token_issuer: AccessTokenIssuer::new(),
        }
    }

    /// Hash a password for storage.
    ///
    /// CPU-bound and deliberately slow; async callers should run it on a
    /// blocking pool.
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.password_hasher.hash(password)
    }

    /// Verify a candidate password against a stored hash.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Password does not match
    /// * `PasswordError` - Stored hash could not be parsed
    pub fn verify_password(
        &self,
        password: &str,
        stored_hash: &str,
    ) -> Result<(), AuthenticationError> {
        if self.password_hasher.verify(password, stored_hash)? {
            Ok(())
        } else {
            Err(AuthenticationError::InvalidCredentials)
        }
    }

    /// Mint an access token and a new refresh token value.
    ///
    /// Both expiries are computed from a single `now` so the pair is
    /// consistent.
    ///
    /// # Errors
    /// * `TokenError` - Signing failed or randomness was unavailable
    pub fn issue_token_pair(
        &self,
        subject: &TokenSubject<'_>,
        lifetimes: TokenLifetimes,
    ) -> Result<IssuedTokens, TokenError> {
        let now = Utc::now();
        let claims = AccessClaims::new(
            subject.user_id,
            subject.email,
            subject.app_id,
            now,
            lifetimes.access,
        );

        let access_token = self.token_issuer.issue(&claims, subject.app_secret)?;
        let refresh_token = generate_refresh_token()?;

        Ok(IssuedTokens {
            access_token,
            refresh_token,
            refresh_token_expires_at: now + lifetimes.refresh,
        })
    }

    /// Validate and decode an access token with its application's secret.
    pub fn validate_access_token(
        &self,
        token: &str,
        app_secret: &[u8],
    ) -> Result<AccessClaims, TokenError> {
        self.token_issuer.verify(token, app_secret)
    }
}
