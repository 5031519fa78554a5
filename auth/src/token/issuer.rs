use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::AccessClaims;
use super::errors::TokenError;

/// Signs and verifies access tokens.
///
/// Every application has its own secret, so keys are supplied per call
/// instead of being fixed at construction. Uses HS256.
#[derive(Debug, Clone)]
pub struct AccessTokenIssuer {
    algorithm: Algorithm,
}

impl AccessTokenIssuer {
    pub fn new() -> Self {
        Self {
            algorithm: Algorithm::HS256,
        }
    }

    /// Sign claims with an application secret.
    ///
    /// # Returns
    /// Compact JWS string
    ///
    /// # Errors
    /// * `EmptySecret` - The application has no secret configured
    /// * `EncodingFailed` - Token encoding failed
    pub fn issue(&self, claims: &AccessClaims, secret: &[u8]) -> Result<String, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }

        encode(
            &Header::new(self.algorithm),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .map_err(|e| TokenError::EncodingFailed(e.to_string()))
    }

    /// Verify signature and expiry of a token.
    ///
    /// Stateless: only the application secret is required.
    ///
    /// # Errors
    /// * `EmptySecret` - No secret supplied
    /// * `InvalidSignature` - Token was not signed with this secret
    /// * `Expired` - `exp` is in the past
    /// * `DecodingFailed` - Token is malformed
    pub fn verify(&self, token: &str, secret: &[u8]) -> Result<AccessClaims, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }

        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        decode::<AccessClaims>(token, &DecodingKey::from_secret(secret), &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::DecodingFailed(e.to_string()),
            })
    }
}

impl Default for AccessTokenIssuer {
    fn default() -> Self {
        Self::new()
    }
}
