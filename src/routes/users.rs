use axum::extract::State;
use axum::routing::get;
use axum::Router;
use validator::Validate;

use crate::db::models::{PublicUser, UserPatch};
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiJson, ApiPath, CurrentUser, MaybeUser};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::uploads;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/users/{id}",
        get(get_user).put(update_user).delete(delete_user),
    )
}

async fn get_user(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<ApiResponse<PublicUser>> {
    let user = state
        .users
        .get_user(id, viewer.id())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(ApiResponse::ok(user))
}

async fn update_user(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<UserPatch>,
) -> AppResult<ApiResponse<PublicUser>> {
    patch.validate()?;
    let updated = state
        .users
        .update_profile(id, user.id, patch)
        .await?
        .ok_or_else(|| AppError::Forbidden("You can only edit your own profile".into()))?;
    Ok(ApiResponse::ok(updated))
}

async fn delete_user(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<ApiResponse<()>> {
    let Some(urls) = state.users.delete_user(id, user.id).await? else {
        return Err(AppError::Forbidden(
            "You can only delete your own account".into(),
        ));
    };
    let uploads_dir = state.config.uploads_path();
    for url in &urls {
        uploads::remove(&uploads_dir, url).await;
    }
    Ok(ApiResponse::message("Account deleted"))
}
