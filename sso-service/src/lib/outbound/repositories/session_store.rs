use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::query::QueryAs;
use sqlx::PgPool;
use sqlx::Postgres;
use sqlx::Transaction;
use tracing::Instrument;
use uuid::Uuid;

use super::sql::classify;
use super::sql::query_span;
use crate::domain::session::errors::StoreError;
use crate::domain::session::models::Application;
use crate::domain::session::models::ApplicationId;
use crate::domain::session::models::EmailAddress;
use crate::domain::session::models::NewRefreshToken;
use crate::domain::session::models::RefreshToken;
use crate::domain::session::models::RefreshTokenId;
use crate::domain::session::models::User;
use crate::domain::session::models::UserId;
use crate::domain::session::ports::SessionStore;

const INSERT_USER: &str = r#"
    INSERT INTO users (id, email, pass_hash)
    VALUES ($1, $2, $3)
"#;

const SELECT_USER_BY_EMAIL: &str = r#"
    SELECT id, email, pass_hash
    FROM users
    WHERE email = $1
"#;

const SELECT_USER_BY_ID: &str = r#"
    SELECT id, email, pass_hash
    FROM users
    WHERE id = $1
"#;

const SELECT_APPLICATION: &str = r#"
    SELECT id, name, secret
    FROM apps
    WHERE id = $1
"#;

const INSERT_REFRESH_TOKEN: &str = r#"
    INSERT INTO refresh_tokens (id, user_id, app_id, value, created_at, expires_at, revoked)
    VALUES ($1, $2, $3, $4, $5, $6, FALSE)
"#;

// Only active rows flip, so a second revocation of the same row affects nothing.
const REVOKE_REFRESH_TOKEN: &str = r#"
    UPDATE refresh_tokens
    SET revoked = TRUE
    WHERE id = $1 AND revoked = FALSE
"#;

const SELECT_REFRESH_TOKEN_BY_VALUE: &str = r#"
    SELECT id, user_id, app_id, value, created_at, expires_at, revoked
    FROM refresh_tokens
    WHERE value = $1
"#;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    pass_hash: String,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId(row.id),
            email: EmailAddress::new(row.email)
                .map_err(|e| StoreError::Database(format!("stored email is invalid: {}", e)))?,
            password_hash: row.pass_hash,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    id: i32,
    name: String,
    secret: String,
}

impl From<ApplicationRow> for Application {
    fn from(row: ApplicationRow) -> Self {
        Application {
            id: ApplicationId(row.id),
            name: row.name,
            secret: row.secret,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    user_id: Uuid,
    app_id: i32,
    value: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshToken {
            id: RefreshTokenId(row.id),
            user_id: UserId(row.user_id),
            app_id: ApplicationId(row.app_id),
            value: row.value,
            created_at: row.created_at,
            expires_at: row.expires_at,
            revoked: row.revoked,
        }
    }
}

fn select_user_by_id(id: &UserId) -> QueryAs<'static, Postgres, UserRow, PgArguments> {
    sqlx::query_as(SELECT_USER_BY_ID).bind(id.0)
}

fn select_application(id: ApplicationId) -> QueryAs<'static, Postgres, ApplicationRow, PgArguments> {
    sqlx::query_as(SELECT_APPLICATION).bind(id.0)
}

fn select_refresh_token(value: &str) -> QueryAs<'_, Postgres, RefreshTokenRow, PgArguments> {
    sqlx::query_as(SELECT_REFRESH_TOKEN_BY_VALUE).bind(value)
}

fn insert_refresh_token(
    id: RefreshTokenId,
    token: &NewRefreshToken,
) -> Query<'_, Postgres, PgArguments> {
    sqlx::query(INSERT_REFRESH_TOKEN)
        .bind(id.0)
        .bind(token.user_id.0)
        .bind(token.app_id.0)
        .bind(token.value.as_str())
        .bind(Utc::now())
        .bind(token.expires_at)
}

/// PostgreSQL-backed `SessionStore`.
///
/// Transaction-scoped methods take the `sqlx` transaction opened by
/// `PostgresUnitOfWork`.
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    type Tx = Transaction<'static, Postgres>;

    async fn create_user(
        &self,
        email: &EmailAddress,
        password_hash: &str,
    ) -> Result<UserId, StoreError> {
        let id = UserId::new();

        sqlx::query(INSERT_USER)
            .bind(id.0)
            .bind(email.as_str())
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(query_span("INSERT", INSERT_USER))
            .await
            .map_err(|e| classify(e, "user"))?;

        Ok(id)
    }

    async fn get_user_by_email(&self, email: &EmailAddress) -> Result<User, StoreError> {
        sqlx::query_as::<_, UserRow>(SELECT_USER_BY_EMAIL)
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", SELECT_USER_BY_EMAIL))
            .await
            .map_err(|e| classify(e, "user"))?
            .ok_or_else(|| StoreError::NotFound("user".to_string()))?
            .try_into()
    }

    async fn get_user_by_id_tx(
        &self,
        tx: &mut Self::Tx,
        id: &UserId,
    ) -> Result<User, StoreError> {
        select_user_by_id(id)
            .fetch_optional(&mut **tx)
            .instrument(query_span("SELECT", SELECT_USER_BY_ID))
            .await
            .map_err(|e| classify(e, "user"))?
            .ok_or_else(|| StoreError::NotFound(format!("user {}", id)))?
            .try_into()
    }

    async fn get_application(&self, id: ApplicationId) -> Result<Application, StoreError> {
        select_application(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", SELECT_APPLICATION))
            .await
            .map_err(|e| classify(e, "application"))?
            .map(Application::from)
            .ok_or_else(|| StoreError::NotFound(format!("application {}", id)))
    }

    async fn get_application_tx(
        &self,
        tx: &mut Self::Tx,
        id: ApplicationId,
    ) -> Result<Application, StoreError> {
        select_application(id)
            .fetch_optional(&mut **tx)
            .instrument(query_span("SELECT", SELECT_APPLICATION))
            .await
            .map_err(|e| classify(e, "application"))?
            .map(Application::from)
            .ok_or_else(|| StoreError::NotFound(format!("application {}", id)))
    }

    async fn save_refresh_token(
        &self,
        token: &NewRefreshToken,
    ) -> Result<RefreshTokenId, StoreError> {
        let id = RefreshTokenId::new();

        insert_refresh_token(id, token)
            .execute(&self.pool)
            .instrument(query_span("INSERT", INSERT_REFRESH_TOKEN))
            .await
            .map_err(|e| classify(e, "refresh token"))?;

        Ok(id)
    }

    async fn save_refresh_token_tx(
        &self,
        tx: &mut Self::Tx,
        token: &NewRefreshToken,
    ) -> Result<RefreshTokenId, StoreError> {
        let id = RefreshTokenId::new();

        insert_refresh_token(id, token)
            .execute(&mut **tx)
            .instrument(query_span("INSERT", INSERT_REFRESH_TOKEN))
            .await
            .map_err(|e| classify(e, "refresh token"))?;

        Ok(id)
    }

    async fn revoke_refresh_token_tx(
        &self,
        tx: &mut Self::Tx,
        id: &RefreshTokenId,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(REVOKE_REFRESH_TOKEN)
            .bind(id.0)
            .execute(&mut **tx)
            .instrument(query_span("UPDATE", REVOKE_REFRESH_TOKEN))
            .await
            .map_err(|e| classify(e, "refresh token"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "refresh token {} is no longer active",
                id
            )));
        }

        Ok(())
    }

    async fn get_refresh_token_by_value(&self, value: &str) -> Result<RefreshToken, StoreError> {
        select_refresh_token(value)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", SELECT_REFRESH_TOKEN_BY_VALUE))
            .await
            .map_err(|e| classify(e, "refresh token"))?
            .map(RefreshToken::from)
            .ok_or_else(|| StoreError::NotFound("refresh token".to_string()))
    }

    async fn get_refresh_token_by_value_tx(
        &self,
        tx: &mut Self::Tx,
        value: &str,
    ) -> Result<RefreshToken, StoreError> {
        select_refresh_token(value)
            .fetch_optional(&mut **tx)
            .instrument(query_span("SELECT", SELECT_REFRESH_TOKEN_BY_VALUE))
            .await
            .map_err(|e| classify(e, "refresh token"))?
            .map(RefreshToken::from)
            .ok_or_else(|| StoreError::NotFound("refresh token".to_string()))
    }
}
