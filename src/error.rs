use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::auth::AuthError;
use crate::repositories::RepositoryError;
use crate::response::ApiResponse;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::EmailTaken => AppError::Conflict("Email already in use".into()),
            AuthError::UsernameTaken => AppError::Conflict("Username already taken".into()),
            AuthError::InvalidCredentials => AppError::Unauthorized,
            AuthError::Repository(e) => AppError::Repository(e),
            AuthError::Hash(e) => AppError::Internal(format!("password hashing failed: {}", e)),
            AuthError::Token(e) => AppError::Internal(format!("token encoding failed: {}", e)),
            AuthError::Task(e) => AppError::Internal(format!("blocking task failed: {}", e)),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(validation_messages(&errors))
    }
}

/// Field messages, ordered by field name so responses are stable.
pub fn validation_messages(errors: &validator::ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiResponse::failure(msg)),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ApiResponse::failure("Unauthorized"),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, ApiResponse::failure(msg)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiResponse::failure(msg)),
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                ApiResponse::failure("Validation failed").with_errors(errors),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ApiResponse::failure(msg)),
            AppError::Repository(e) => {
                tracing::error!("Repository error: {}", e);
                internal()
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                internal()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                internal()
            }
        };

        (status, Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, ApiResponse<()>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ApiResponse::failure("Internal server error"),
    )
}

pub type AppResult<T> = Result<T, AppError>;
