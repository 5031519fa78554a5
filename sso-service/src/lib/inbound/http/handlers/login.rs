use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use thiserror::Error;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::session::models::ApplicationId;
use crate::domain::session::models::EmailAddress;
use crate::domain::session::models::LoginCommand;
use crate::domain::session::models::TokensInfo;
use crate::domain::session::ports::AuthServicePort;
use crate::inbound::http::router::AppState;
use crate::session::errors::EmailError;

pub async fn login<AS: AuthServicePort>(
    State(state): State<AppState<AS>>,
    Json(body): Json<LoginRequest>,
) -> Result<ApiSuccess<TokensInfo>, ApiError> {
    state
        .auth_service
        .login(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|tokens| ApiSuccess::new(StatusCode::OK, tokens))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
    app_id: i32,
}

#[derive(Debug, Clone, Error)]
enum ParseLoginRequestError {
    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("app_id is required")]
    MissingAppId,
}

impl LoginRequest {
    fn try_into_command(self) -> Result<LoginCommand, ParseLoginRequestError> {
        let email = EmailAddress::new(self.email)?;
        if self.password.is_empty() {
            return Err(ParseLoginRequestError::EmptyPassword);
        }
        if self.app_id == 0 {
            return Err(ParseLoginRequestError::MissingAppId);
        }
        Ok(LoginCommand {
            email,
            password: self.password,
            app_id: ApplicationId(self.app_id),
        })
    }
}

impl From<ParseLoginRequestError> for ApiError {
    fn from(err: ParseLoginRequestError) -> Self {
        ApiError::UnprocessableEntity(err.to_string())
    }
}
