use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Payload of an access token.
///
/// Carries everything a downstream service needs to authorize a request
/// without a database round-trip: who (`uid`, `email`), for which tenant
/// application (`app_id`) and until when (`exp`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    /// User identifier
    pub uid: String,

    /// User email at issue time
    pub email: String,

    /// Application the token was issued for
    pub app_id: i32,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Absolute expiry (Unix timestamp)
    pub exp: i64,
}

impl AccessClaims {
    /// Build claims that expire `ttl` after `issued_at`.
    pub fn new(
        uid: impl ToString,
        email: impl Into<String>,
        app_id: i32,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            uid: uid.to_string(),
            email: email.into(),
            app_id,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }
}
