use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use validator::Validate;

use crate::auth::AuthPayload;
use crate::db::models::{validate_username, PublicUser};
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiJson, CurrentUser};
use crate::response::{created, ApiResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

async fn register(
    State(state): State<AppState>,
    ApiJson(mut body): ApiJson<RegisterRequest>,
) -> AppResult<Response> {
    body.username = body.username.trim().to_string();
    body.email = body.email.trim().to_string();
    body.validate()?;

    let payload = state
        .auth
        .register(&body.username, &body.email, &body.password)
        .await?;
    Ok(created(payload))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(mut body): ApiJson<LoginRequest>,
) -> AppResult<ApiResponse<AuthPayload>> {
    body.email = body.email.trim().to_string();
    body.validate()?;

    let payload = state.auth.login(&body.email, &body.password).await?;
    Ok(ApiResponse::ok(payload))
}

async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<ApiResponse<PublicUser>> {
    let profile = state
        .users
        .get_user(user.id, Some(user.id))
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(ApiResponse::ok(profile))
}
