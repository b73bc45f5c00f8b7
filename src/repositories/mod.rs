// Repository pattern - every SQL statement the server issues lives below here
pub mod collections;
pub mod comments;
pub mod images;
pub mod likes;
pub mod saves;
pub mod users;

use rusqlite::ErrorCode;
use thiserror::Error;

pub use collections::{CollectionRepository, SqliteCollectionRepository};
pub use comments::{CommentRepository, SqliteCommentRepository};
pub use images::{ImageFilter, ImageOrder, ImageRepository, SqliteImageRepository};
pub use likes::{LikeRepository, SqliteLikeRepository};
pub use saves::{SaveRepository, SqliteSaveRepository};
pub use users::{SqliteUserRepository, UserRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// A UNIQUE constraint rejected the write; carries the offending column.
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Maps a UNIQUE violation on `table.column` to `RepositoryError::Conflict`,
/// passing every other error through.
pub(crate) fn unique_violation(err: rusqlite::Error) -> RepositoryError {
    if let rusqlite::Error::SqliteFailure(ref failure, Some(ref message)) = err {
        if failure.code == ErrorCode::ConstraintViolation && message.contains("UNIQUE") {
            let column = message
                .rsplit(' ')
                .next()
                .and_then(|qualified| qualified.split('.').nth(1))
                .unwrap_or("unknown")
                .to_string();
            return RepositoryError::Conflict(column);
        }
    }
    RepositoryError::Sql(err)
}

/// Escapes `%`, `_` and the escape char itself for a `LIKE ... ESCAPE '\'`.
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
