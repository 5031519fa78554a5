use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use auth::AuthenticationError;
use auth::Authenticator;
use auth::TokenLifetimes;
use auth::TokenSubject;
use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::Instrument;
use tracing::Span;

use crate::domain::session::errors::AuthError;
use crate::domain::session::errors::ErrorKind;
use crate::domain::session::errors::StoreError;
use crate::domain::session::models::Application;
use crate::domain::session::models::LoginCommand;
use crate::domain::session::models::NewRefreshToken;
use crate::domain::session::models::RegisterCommand;
use crate::domain::session::models::TokensInfo;
use crate::domain::session::models::User;
use crate::domain::session::models::UserId;
use crate::domain::session::ports::AuthServicePort;
use crate::domain::session::ports::SessionStore;
use crate::domain::session::ports::UnitOfWork;
use crate::domain::session::transaction::run_in_transaction;

/// Password verified against `decoy_hash` when the login email is unknown.
const DECOY_PASSWORD: &str = "decoy-password-for-unknown-accounts";

/// Auth orchestrator: Register, Login and refresh-token rotation.
///
/// Holds no mutable state of its own; every request is independent and all
/// coordination between concurrent rotations is left to the store's
/// transaction isolation.
pub struct AuthService<S, U>
where
    S: SessionStore,
    U: UnitOfWork<Tx = S::Tx>,
{
    store: Arc<S>,
    unit_of_work: Arc<U>,
    authenticator: Arc<Authenticator>,
    lifetimes: TokenLifetimes,
    /// Hash checked on unknown-email logins so both failure paths pay for
    /// one Argon2 verification. Built with the configured parameters on
    /// first use.
    decoy_hash: OnceCell<String>,
}

impl<S, U> AuthService<S, U>
where
    S: SessionStore,
    U: UnitOfWork<Tx = S::Tx>,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `store` - Session persistence
    /// * `unit_of_work` - Transactions over the same storage as `store`
    /// * `authenticator` - Password hashing and token minting
    /// * `lifetimes` - Access and refresh token TTLs
    pub fn new(
        store: Arc<S>,
        unit_of_work: Arc<U>,
        authenticator: Arc<Authenticator>,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            store,
            unit_of_work,
            authenticator,
            lifetimes,
            decoy_hash: OnceCell::new(),
        }
    }

    async fn hash_password(&self, password: String) -> Result<String, AuthError> {
        let authenticator = Arc::clone(&self.authenticator);

        tokio::task::spawn_blocking(move || authenticator.hash_password(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("hashing task failed: {}", e)))?
            .map_err(AuthError::from)
    }

    async fn verify_password(
        &self,
        password: String,
        stored_hash: String,
    ) -> Result<(), AuthError> {
        let authenticator = Arc::clone(&self.authenticator);

        tokio::task::spawn_blocking(move || authenticator.verify_password(&password, &stored_hash))
            .await
            .map_err(|e| AuthError::Internal(format!("verification task failed: {}", e)))?
            .map_err(|e| match e {
                AuthenticationError::InvalidCredentials => AuthError::InvalidCredentials,
                AuthenticationError::PasswordError(err) => AuthError::from(err),
                AuthenticationError::TokenError(err) => AuthError::from(err),
            })
    }

    /// Spend one verification on the decoy hash. The outcome is discarded.
    async fn verify_decoy(&self, password: String) -> Result<(), AuthError> {
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| self.hash_password(DECOY_PASSWORD.to_string()))
            .await?
            .clone();

        match self.verify_password(password, decoy).await {
            Ok(()) | Err(AuthError::InvalidCredentials) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn register_user(&self, command: RegisterCommand) -> Result<UserId, AuthError> {
        let password_hash = self.hash_password(command.password).await?;

        let user_id = self
            .store
            .create_user(&command.email, &password_hash)
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists(_) => {
                    AuthError::EmailAlreadyExists(command.email.to_string())
                }
                other => AuthError::Internal(other.to_string()),
            })?;

        tracing::info!(user_id = %user_id, "User registered");
        Ok(user_id)
    }

    async fn login_user(&self, command: LoginCommand) -> Result<TokensInfo, AuthError> {
        let user = match self.store.get_user_by_email(&command.email).await {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => {
                if let Err(e) = self.verify_decoy(command.password).await {
                    tracing::warn!(error = %e, "Decoy verification failed");
                }
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(AuthError::Internal(e.to_string())),
        };

        self.verify_password(command.password, user.password_hash.clone())
            .await?;

        let app = match self.store.get_application(command.app_id).await {
            Ok(app) => app,
            Err(StoreError::NotFound(_)) => return Err(AuthError::InvalidCredentials),
            Err(e) => return Err(AuthError::Internal(e.to_string())),
        };

        let tokens = mint(&self.authenticator, &user, &app, self.lifetimes)?;

        self.store
            .save_refresh_token(&NewRefreshToken {
                user_id: user.id,
                app_id: app.id,
                value: tokens.refresh_token.clone(),
                expires_at: tokens.refresh_token_expires_at,
            })
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        tracing::info!(user_id = %user.id, app_id = %app.id, "User logged in");
        Ok(tokens)
    }

    async fn rotate(&self, presented: String) -> Result<TokensInfo, AuthError> {
        let store = Arc::clone(&self.store);
        let authenticator = Arc::clone(&self.authenticator);
        let lifetimes = self.lifetimes;

        run_in_transaction(self.unit_of_work.as_ref(), move |tx| {
            Box::pin(async move {
                let token = store
                    .get_refresh_token_by_value_tx(tx, &presented)
                    .await
                    .map_err(|e| match e {
                        StoreError::NotFound(_) => AuthError::RefreshTokenNotFound,
                        other => AuthError::from(other),
                    })?;

                if !token.is_redeemable(Utc::now()) {
                    return Err(AuthError::InvalidRefreshToken);
                }

                store.revoke_refresh_token_tx(tx, &token.id).await?;

                // Both rows existed when the token was issued; a miss here is
                // a data integrity failure and surfaces as Internal.
                let user = store.get_user_by_id_tx(tx, &token.user_id).await?;
                let app = store.get_application_tx(tx, token.app_id).await?;

                let tokens = mint(&authenticator, &user, &app, lifetimes)?;

                store
                    .save_refresh_token_tx(
                        tx,
                        &NewRefreshToken {
                            user_id: token.user_id,
                            app_id: token.app_id,
                            value: tokens.refresh_token.clone(),
                            expires_at: tokens.refresh_token_expires_at,
                        },
                    )
                    .await?;

                tracing::info!(
                    user_id = %token.user_id,
                    app_id = %token.app_id,
                    revoked_token_id = %token.id,
                    "Refresh token rotated"
                );
                Ok(tokens)
            })
        })
        .await
    }
}

#[async_trait]
impl<S, U> AuthServicePort for AuthService<S, U>
where
    S: SessionStore,
    U: UnitOfWork<Tx = S::Tx>,
{
    async fn register(&self, command: RegisterCommand) -> Result<UserId, AuthError> {
        let span = tracing::info_span!("auth.register", email = %command.email);
        traced(span, self.register_user(command)).await
    }

    async fn login(&self, command: LoginCommand) -> Result<TokensInfo, AuthError> {
        let span = tracing::info_span!(
            "auth.login",
            email = %command.email,
            app_id = %command.app_id
        );
        traced(span, self.login_user(command)).await
    }

    async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokensInfo, AuthError> {
        let span = tracing::info_span!("auth.refresh_tokens");
        traced(span, self.rotate(refresh_token.to_string())).await
    }
}

fn mint(
    authenticator: &Authenticator,
    user: &User,
    app: &Application,
    lifetimes: TokenLifetimes,
) -> Result<TokensInfo, AuthError> {
    let user_id = user.id.to_string();
    let subject = TokenSubject {
        user_id: &user_id,
        email: user.email.as_str(),
        app_id: app.id.0,
        app_secret: app.secret.as_bytes(),
    };

    Ok(authenticator.issue_token_pair(&subject, lifetimes)?.into())
}

/// Run an operation inside `span` and log its failure once, by kind.
async fn traced<T, F>(span: Span, operation: F) -> Result<T, AuthError>
where
    F: Future<Output = Result<T, AuthError>>,
{
    async move {
        let result = operation.await;
        if let Err(err) = &result {
            match err.kind() {
                ErrorKind::Internal => {
                    tracing::error!(kind = %err.kind(), error = %err, "Operation failed")
                }
                _ => tracing::warn!(kind = %err.kind(), error = %err, "Operation rejected"),
            }
        }
        result
    }
    .instrument(span)
    .await
}
