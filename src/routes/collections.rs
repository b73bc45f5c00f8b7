use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use validator::Validate;

use crate::db::models::{Category, Collection, CollectionPatch, Image, NewCollection};
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser, MaybeUser};
use crate::pagination::{Page, PageParams, PageRequest};
use crate::response::{created, ApiResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/collections",
            get(list_collections).post(create_collection),
        )
        .route("/collections/user/{user_id}", get(user_collections))
        .route(
            "/collections/{id}",
            get(get_collection)
                .put(update_collection)
                .delete(delete_collection),
        )
        .route("/collections/{id}/images", get(collection_images))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Category,
}

async fn list_collections(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CollectionListQuery>,
) -> AppResult<ApiResponse<Page<Collection>>> {
    let request = PageRequest::from(&PageParams {
        page: query.page,
        page_size: query.page_size,
    });
    let page = state
        .collections
        .get_collections(request, query.user_id)
        .await?;
    Ok(ApiResponse::ok(page))
}

async fn user_collections(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
) -> AppResult<ApiResponse<Vec<Collection>>> {
    let collections = state.collections.get_user_collections(user_id).await?;
    Ok(ApiResponse::ok(collections))
}

async fn get_collection(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<ApiResponse<Collection>> {
    let collection = state
        .collections
        .get_collection_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Collection not found".into()))?;
    Ok(ApiResponse::ok(collection))
}

async fn collection_images(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<ApiResponse<Vec<Image>>> {
    let images = state
        .images
        .get_collection_images(id, viewer.id())
        .await?
        .ok_or_else(|| AppError::NotFound("Collection not found".into()))?;
    Ok(ApiResponse::ok(images))
}

async fn create_collection(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(mut body): ApiJson<CreateCollectionRequest>,
) -> AppResult<Response> {
    body.name = body.name.trim().to_string();
    body.validate()?;

    let collection = state
        .collections
        .create_collection(NewCollection {
            name: body.name,
            description: body.description.filter(|d| !d.trim().is_empty()),
            category: body.category,
            user_id: user.id,
        })
        .await?;
    Ok(created(collection))
}

async fn update_collection(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<CollectionPatch>,
) -> AppResult<ApiResponse<Collection>> {
    patch.validate()?;
    let collection = state
        .collections
        .update_collection(id, user.id, patch)
        .await?
        .ok_or_else(|| AppError::Forbidden("Collection not found or not yours".into()))?;
    Ok(ApiResponse::ok(collection))
}

async fn delete_collection(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<ApiResponse<()>> {
    if !state.collections.delete_collection(id, user.id).await? {
        return Err(AppError::Forbidden(
            "Collection not found or not yours".into(),
        ));
    }
    Ok(ApiResponse::message("Collection deleted"))
}
