use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::session::models::TokensInfo;
use crate::domain::session::ports::AuthServicePort;
use crate::inbound::http::router::AppState;

pub async fn refresh_tokens<AS: AuthServicePort>(
    State(state): State<AppState<AS>>,
    Json(body): Json<RefreshTokensRequest>,
) -> Result<ApiSuccess<TokensInfo>, ApiError> {
    if body.refresh_token.is_empty() {
        return Err(ApiError::UnprocessableEntity(
            "refresh_token must not be empty".to_string(),
        ));
    }

    state
        .auth_service
        .refresh_tokens(&body.refresh_token)
        .await
        .map_err(ApiError::from)
        .map(|tokens| ApiSuccess::new(StatusCode::OK, tokens))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshTokensRequest {
    refresh_token: String,
}
