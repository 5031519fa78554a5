use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use super::errors::TokenError;

/// Bytes of entropy in a refresh token value.
const REFRESH_TOKEN_BYTES: usize = 32;

/// Generate an opaque refresh token value.
///
/// 256 bits from the operating system CSPRNG, URL-safe base64 without
/// padding (43 characters).
///
/// # Errors
/// * `RandomnessUnavailable` - The OS randomness source failed
pub fn generate_refresh_token() -> Result<String, TokenError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| TokenError::RandomnessUnavailable(e.to_string()))?;

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
