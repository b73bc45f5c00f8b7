use async_trait::async_trait;
use rusqlite::{params, TransactionBehavior};

use crate::repositories::RepositoryError;
use crate::state::DbPool;

#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Adds the like and bumps `images.likes` in one transaction.
    /// Returns false (and changes nothing) if the like already existed.
    async fn like(&self, user_id: i64, image_id: i64) -> Result<bool, RepositoryError>;

    /// Removes the like and lowers the counter in one transaction.
    /// Returns false (and changes nothing) if there was no like.
    async fn unlike(&self, user_id: i64, image_id: i64) -> Result<bool, RepositoryError>;

    async fn exists(&self, user_id: i64, image_id: i64) -> Result<bool, RepositoryError>;
}

pub struct SqliteLikeRepository {
    pool: DbPool,
}

impl SqliteLikeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LikeRepository for SqliteLikeRepository {
    async fn like(&self, user_id: i64, image_id: i64) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO likes (user_id, image_id) VALUES (?1, ?2)",
            params![user_id, image_id],
        )?;
        if inserted > 0 {
            tx.execute(
                "UPDATE images SET likes = likes + 1 WHERE id = ?1",
                params![image_id],
            )?;
        }

        tx.commit()?;
        Ok(inserted > 0)
    }

    async fn unlike(&self, user_id: i64, image_id: i64) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let removed = tx.execute(
            "DELETE FROM likes WHERE user_id = ?1 AND image_id = ?2",
            params![user_id, image_id],
        )?;
        if removed > 0 {
            tx.execute(
                "UPDATE images SET likes = MAX(likes - 1, 0) WHERE id = ?1",
                params![image_id],
            )?;
        }

        tx.commit()?;
        Ok(removed > 0)
    }

    async fn exists(&self, user_id: i64, image_id: i64) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM likes WHERE user_id = ?1 AND image_id = ?2)",
            params![user_id, image_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}
