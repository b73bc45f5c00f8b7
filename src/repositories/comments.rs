use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::models::{Author, Comment};
use crate::repositories::RepositoryError;
use crate::state::DbPool;

const COMMENT_SELECT: &str = "SELECT c.id, c.content, c.user_id, c.image_id, c.created_at,
        u.username, u.profile_image
     FROM comments c
     JOIN users u ON u.id = c.user_id";

#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Newest first, authors joined in.
    async fn list_for_image(&self, image_id: i64) -> Result<Vec<Comment>, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, RepositoryError>;

    /// Returns the new row id.
    async fn insert(
        &self,
        image_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<i64, RepositoryError>;

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;
}

pub struct SqliteCommentRepository {
    pool: DbPool,
}

impl SqliteCommentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn row_to_comment(row: &Row) -> Result<Comment, rusqlite::Error> {
        let user_id: i64 = row.get(2)?;
        Ok(Comment {
            id: row.get(0)?,
            content: row.get(1)?,
            user_id,
            image_id: row.get(3)?,
            created_at: row.get(4)?,
            user: Author {
                id: user_id,
                username: row.get(5)?,
                profile_image: row.get(6)?,
            },
        })
    }
}

#[async_trait]
impl CommentRepository for SqliteCommentRepository {
    async fn list_for_image(&self, image_id: i64) -> Result<Vec<Comment>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE c.image_id = ?1 ORDER BY c.created_at DESC, c.id DESC",
            COMMENT_SELECT
        ))?;
        let comments = stmt
            .query_map(params![image_id], Self::row_to_comment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, RepositoryError> {
        let conn = self.pool.get()?;
        let comment = conn
            .query_row(
                &format!("{} WHERE c.id = ?1", COMMENT_SELECT),
                params![id],
                Self::row_to_comment,
            )
            .optional()?;
        Ok(comment)
    }

    async fn insert(
        &self,
        image_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<i64, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO comments (content, user_id, image_id) VALUES (?1, ?2, ?3)",
            params![content, user_id, image_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}
