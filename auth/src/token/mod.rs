pub mod claims;
pub mod errors;
pub mod issuer;
pub mod refresh;

pub use claims::AccessClaims;
pub use errors::TokenError;
pub use issuer::AccessTokenIssuer;
pub use refresh::generate_refresh_token;
