//! Authentication utilities library
//!
//! Provides the stateless building blocks of the session service:
//! - Password hashing and verification (Argon2id)
//! - Access token signing and validation (HS256, per-application secrets)
//! - Refresh token value generation (OS CSPRNG)
//! - Authentication coordination
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::with_params(1024, 1, 1).unwrap();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash).unwrap());
//! ```
//!
//! ## Token Pairs
//! ```
//! use auth::{Authenticator, PasswordHasher, TokenLifetimes, TokenSubject};
//! use chrono::Duration;
//!
//! let auth = Authenticator::new(PasswordHasher::new());
//! let subject = TokenSubject {
//!     user_id: "user123",
//!     email: "alice@example.com",
//!     app_id: 1,
//!     app_secret: b"secret_key_at_least_32_bytes_long!",
//! };
//! let lifetimes = TokenLifetimes {
//!     access: Duration::minutes(15),
//!     refresh: Duration::days(30),
//! };
//!
//! let tokens = auth.issue_token_pair(&subject, lifetimes).unwrap();
//! let claims = auth
//!     .validate_access_token(&tokens.access_token, subject.app_secret)
//!     .unwrap();
//! assert_eq!(claims.uid, "user123");
//! ```

pub mod authenticator;
pub mod password;
pub mod token;

pub use authenticator::AuthenticationError;
pub use authenticator::Authenticator;
pub use authenticator::IssuedTokens;
pub use authenticator::TokenLifetimes;
pub use authenticator::TokenSubject;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use token::AccessClaims;
pub use token::AccessTokenIssuer;
pub use token::TokenError;
