use async_trait::async_trait;

use crate::domain::session::errors::AuthError;
use crate::domain::session::errors::StoreError;
use crate::domain::session::models::Application;
use crate::domain::session::models::ApplicationId;
use crate::domain::session::models::EmailAddress;
use crate::domain::session::models::LoginCommand;
use crate::domain::session::models::NewRefreshToken;
use crate::domain::session::models::RefreshToken;
use crate::domain::session::models::RefreshTokenId;
use crate::domain::session::models::RegisterCommand;
use crate::domain::session::models::TokensInfo;
use crate::domain::session::models::User;
use crate::domain::session::models::UserId;

/// Port for session operations exposed to transport layers.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register a new user.
    ///
    /// # Returns
    /// Identifier of the created user
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `Internal` - Hashing or storage failed
    async fn register(&self, command: RegisterCommand) -> Result<UserId, AuthError>;

    /// Authenticate credentials for an application and mint a token pair.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Unknown email, wrong password or unknown application
    /// * `Internal` - Token issuing or storage failed
    async fn login(&self, command: LoginCommand) -> Result<TokensInfo, AuthError>;

    /// Redeem a refresh token for a new pair, revoking it.
    ///
    /// # Errors
    /// * `RefreshTokenNotFound` - Value was never issued
    /// * `InvalidRefreshToken` - Token is revoked or expired
    /// * `Conflict` - A concurrent rotation of the same token won
    /// * `Internal` - Storage failed or the token references missing rows
    async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokensInfo, AuthError>;
}

/// Persistence for users, applications and refresh tokens.
///
/// Methods suffixed `_tx` run inside a transaction opened by the paired
/// `UnitOfWork`; the others use their own connection.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    type Tx: Send + 'static;

    /// # Errors
    /// * `AlreadyExists` - Email is taken
    async fn create_user(
        &self,
        email: &EmailAddress,
        password_hash: &str,
    ) -> Result<UserId, StoreError>;

    /// # Errors
    /// * `NotFound` - No user with this email
    async fn get_user_by_email(&self, email: &EmailAddress) -> Result<User, StoreError>;

    /// # Errors
    /// * `NotFound` - No user with this id
    async fn get_user_by_id_tx(&self, tx: &mut Self::Tx, id: &UserId)
        -> Result<User, StoreError>;

    /// # Errors
    /// * `NotFound` - No application with this id
    async fn get_application(&self, id: ApplicationId) -> Result<Application, StoreError>;

    /// # Errors
    /// * `NotFound` - No application with this id
    async fn get_application_tx(
        &self,
        tx: &mut Self::Tx,
        id: ApplicationId,
    ) -> Result<Application, StoreError>;

    async fn save_refresh_token(
        &self,
        token: &NewRefreshToken,
    ) -> Result<RefreshTokenId, StoreError>;

    async fn save_refresh_token_tx(
        &self,
        tx: &mut Self::Tx,
        token: &NewRefreshToken,
    ) -> Result<RefreshTokenId, StoreError>;

    /// Flip a token from active to revoked.
    ///
    /// # Errors
    /// * `Conflict` - The token was not active anymore
    async fn revoke_refresh_token_tx(
        &self,
        tx: &mut Self::Tx,
        id: &RefreshTokenId,
    ) -> Result<(), StoreError>;

    /// # Errors
    /// * `NotFound` - Value was never issued
    async fn get_refresh_token_by_value(&self, value: &str) -> Result<RefreshToken, StoreError>;

    /// # Errors
    /// * `NotFound` - Value was never issued
    async fn get_refresh_token_by_value_tx(
        &self,
        tx: &mut Self::Tx,
        value: &str,
    ) -> Result<RefreshToken, StoreError>;
}

/// Transaction lifecycle for a `SessionStore`.
///
/// Transactions must run at serializable isolation (or anything equally
/// conflict-detecting). Dropping a `Tx` without committing rolls it back.
#[async_trait]
pub trait UnitOfWork: Send + Sync + 'static {
    type Tx: Send + 'static;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// # Errors
    /// * `Conflict` - Serialization failure detected at commit
    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError>;

    async fn rollback(&self, tx: Self::Tx) -> Result<(), StoreError>;
}
