// Authentication HTTP handlers

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use worktime_core::{
    models::{IssuedResetToken, User},
    service::auth::IssuedToken,
};

use super::{middleware::AuthUser, AppResult, AppState};

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub authentication_token: IssuedToken,
    pub user: User,
}

/// Exchange email and password for an access token
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let Json(req) = payload?;

    let (user, authentication_token) = state.user_service.login(&req.email, &req.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            authentication_token,
            user,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ResetTokenRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ResetTokenResponse {
    pub reset_token: IssuedResetToken,
}

/// Admin only: one-time token letting a user choose a new password
pub async fn issue_reset_token(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    payload: Result<Json<ResetTokenRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<ResetTokenResponse>)> {
    let Json(req) = payload?;

    let reset_token = state
        .user_service
        .issue_reset_token(&principal, &req.email)
        .await?;

    Ok((StatusCode::CREATED, Json(ResetTokenResponse { reset_token })))
}
