use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::Router;
use serde::Deserialize;
use validator::Validate;

use crate::db::models::{Category, Comment, Image, ImagePatch, NewImage};
use crate::error::{validation_messages, AppError, AppResult};
use crate::extractors::{ApiJson, ApiPath, ApiQuery, CurrentUser, MaybeUser};
use crate::pagination::{Page, PageParams, PageRequest};
use crate::response::{created, ApiResponse};
use crate::state::AppState;
use crate::uploads;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/images", get(list_images).post(create_image))
        .route("/images/popular", get(popular_images))
        .route("/images/user/{user_id}", get(user_images))
        .route(
            "/images/{id}",
            get(get_image).put(update_image).delete(delete_image),
        )
        .route("/images/{id}/like", post(like_image))
        .route("/images/{id}/unlike", post(unlike_image))
        .route("/images/{id}/save", post(save_image))
        .route("/images/{id}/unsave", post(unsave_image))
        .route("/images/{id}/comments", get(list_comments).post(add_comment))
        .route("/images/{id}/comments/{comment_id}", delete(delete_comment))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ImageListQuery {
    fn page_request(&self) -> PageRequest {
        PageRequest::from(&PageParams {
            page: self.page,
            page_size: self.page_size,
        })
    }

    /// Blank filters are treated as absent.
    fn category(&self) -> AppResult<Option<Category>> {
        match self.category.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<Category>()
                .map(Some)
                .map_err(|e| AppError::BadRequest(e.to_string())),
        }
    }

    fn search(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Text fields of the upload form.
#[derive(Debug, Default, Validate)]
pub struct ImageForm {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    #[validate(length(max = 2048, message = "Link must be at most 2048 characters"))]
    pub link: Option<String>,
    #[validate(length(max = 2048, message = "Image URL must be at most 2048 characters"))]
    pub url: Option<String>,
    pub category: Option<String>,
    pub collection_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub collection_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 500, message = "Comment must be 1-500 characters"))]
    pub content: String,
}

async fn list_images(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiQuery(query): ApiQuery<ImageListQuery>,
) -> AppResult<ApiResponse<Page<Image>>> {
    let page = state
        .images
        .get_images(
            query.page_request(),
            query.category()?,
            query.search(),
            viewer.id(),
        )
        .await?;
    Ok(ApiResponse::ok(page))
}

async fn popular_images(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiQuery(params): ApiQuery<PageParams>,
) -> AppResult<ApiResponse<Page<Image>>> {
    let page = state
        .images
        .get_popular_images(PageRequest::from(&params), viewer.id())
        .await?;
    Ok(ApiResponse::ok(page))
}

async fn user_images(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(user_id): ApiPath<i64>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> AppResult<ApiResponse<Page<Image>>> {
    let page = state
        .images
        .get_user_images(user_id, PageRequest::from(&params), viewer.id())
        .await?;
    Ok(ApiResponse::ok(page))
}

async fn get_image(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<ApiResponse<Image>> {
    let image = state
        .images
        .get_image_by_id(id, viewer.id())
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".into()))?;
    Ok(ApiResponse::ok(image))
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::BadRequest(err.body_text())
}

async fn text(field: Field<'_>) -> AppResult<String> {
    field.text().await.map_err(multipart_error)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Accepts the file under `image` or `file`, or an external `url` field
/// instead of a file.
async fn create_image(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut form = ImageForm::default();
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" | "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                if !data.is_empty() {
                    file = Some((file_name, data));
                }
            }
            "title" => form.title = text(field).await?.trim().to_string(),
            "description" => form.description = non_empty(text(field).await?),
            "link" => form.link = non_empty(text(field).await?),
            "url" => form.url = non_empty(text(field).await?),
            "category" => form.category = non_empty(text(field).await?),
            "collectionId" => form.collection_id = non_empty(text(field).await?),
            _ => {}
        }
    }

    let mut errors = match form.validate() {
        Ok(()) => Vec::new(),
        Err(e) => validation_messages(&e),
    };
    let category = match form.category.as_deref() {
        None => Category::default(),
        Some(raw) => raw.parse::<Category>().unwrap_or_else(|_| {
            errors.push(format!("Unknown category '{}'", raw));
            Category::default()
        }),
    };
    let collection_id = match form.collection_id.as_deref() {
        None => None,
        Some(raw) => match raw.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                errors.push("collectionId must be a number".into());
                None
            }
        },
    };
    if file.is_none() && form.url.is_none() {
        errors.push("An image file or url is required".into());
    }
    if form.url.as_deref().is_some_and(uploads::is_upload_url) {
        errors.push("Image URL must not point at an uploaded file".into());
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let uploads_dir = state.config.uploads_path();
    let (url, stored) = match (file, form.url) {
        (Some((file_name, data)), _) => {
            let url = uploads::store(&uploads_dir, &file_name, &data).await?;
            (url, true)
        }
        (None, Some(url)) => (url, false),
        (None, None) => {
            return Err(AppError::Validation(vec![
                "An image file or url is required".into(),
            ]))
        }
    };

    let new_image = NewImage {
        url: url.clone(),
        title: form.title,
        description: form.description,
        link: form.link,
        category,
        user_id: user.id,
        collection_id,
    };

    match state.images.create_image(new_image).await {
        Ok(Some(image)) => Ok(created(image)),
        Ok(None) => {
            if stored {
                uploads::remove(&uploads_dir, &url).await;
            }
            Err(AppError::Forbidden("Collection not found or not yours".into()))
        }
        Err(e) => {
            if stored {
                uploads::remove(&uploads_dir, &url).await;
            }
            Err(e.into())
        }
    }
}

async fn update_image(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<ImagePatch>,
) -> AppResult<ApiResponse<Image>> {
    let patch = patch.normalized();
    patch.validate()?;
    let image = state
        .images
        .update_image(id, user.id, patch)
        .await?
        .ok_or_else(|| AppError::Forbidden("Image not found or not yours".into()))?;
    Ok(ApiResponse::ok(image))
}

async fn delete_image(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<ApiResponse<()>> {
    let url = state
        .images
        .get_image_by_id(id, None)
        .await?
        .map(|image| image.url);

    if !state.images.delete_image(id, user.id).await? {
        return Err(AppError::Forbidden("Image not found or not yours".into()));
    }
    if let Some(url) = url {
        uploads::remove(&state.config.uploads_path(), &url).await;
    }
    Ok(ApiResponse::message("Image deleted"))
}

async fn like_image(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<ApiResponse<Image>> {
    let image = state
        .images
        .like_image(id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".into()))?;
    Ok(ApiResponse::ok(image))
}

async fn unlike_image(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<ApiResponse<Image>> {
    let image = state
        .images
        .unlike_image(id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".into()))?;
    Ok(ApiResponse::ok(image))
}

async fn save_image(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<SaveRequest>,
) -> AppResult<ApiResponse<Image>> {
    if let Some(image) = state
        .images
        .save_image(id, user.id, body.collection_id)
        .await?
    {
        return Ok(ApiResponse::ok(image).with_message("Image saved"));
    }

    if state.images.get_image_by_id(id, None).await?.is_none() {
        Err(AppError::NotFound("Image not found".into()))
    } else {
        Err(AppError::Forbidden("Collection not found or not yours".into()))
    }
}

async fn unsave_image(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<ApiResponse<Image>> {
    let image = state
        .images
        .unsave_image(id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".into()))?;
    Ok(ApiResponse::ok(image))
}

async fn list_comments(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<ApiResponse<Vec<Comment>>> {
    let comments = state
        .images
        .get_comments(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".into()))?;
    Ok(ApiResponse::ok(comments))
}

async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(mut body): ApiJson<CommentRequest>,
) -> AppResult<Response> {
    body.content = body.content.trim().to_string();
    body.validate()?;

    let comment = state
        .images
        .add_comment(id, user.id, &body.content)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".into()))?;
    Ok(created(comment))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath((id, comment_id)): ApiPath<(i64, i64)>,
) -> AppResult<ApiResponse<()>> {
    if !state.images.delete_comment(id, comment_id, user.id).await? {
        return Err(AppError::Forbidden("Comment not found or not yours".into()));
    }
    Ok(ApiResponse::message("Comment deleted"))
}
