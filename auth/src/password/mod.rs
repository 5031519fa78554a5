//! Credential verification: Argon2id password hashing.

pub mod errors;
pub mod hasher;

pub use errors::PasswordError;
pub use hasher::PasswordHasher;
