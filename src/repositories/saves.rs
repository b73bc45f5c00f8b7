use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, TransactionBehavior};

use crate::repositories::RepositoryError;
use crate::state::DbPool;

#[async_trait]
pub trait SaveRepository: Send + Sync {
    /// Files `image_id` into `collection_id` for `user_id`. A user holds at most
    /// one save per image; saving again moves it. `images.saves` grows only for
    /// a new save. When the user owns the image, `images.collection_id` follows.
    /// Returns true when a new save row was created.
    async fn save(
        &self,
        user_id: i64,
        image_id: i64,
        collection_id: i64,
    ) -> Result<bool, RepositoryError>;

    /// Drops the user's save and, for the owner, clears `images.collection_id`.
    /// Returns true when anything changed.
    async fn unsave(&self, user_id: i64, image_id: i64) -> Result<bool, RepositoryError>;

    /// Saved through `user_saves`, or filed into a collection by its owner.
    async fn is_saved(&self, user_id: i64, image_id: i64) -> Result<bool, RepositoryError>;
}

pub struct SqliteSaveRepository {
    pool: DbPool,
}

impl SqliteSaveRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SaveRepository for SqliteSaveRepository {
    async fn save(
        &self,
        user_id: i64,
        image_id: i64,
        collection_id: i64,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT collection_id FROM user_saves WHERE user_id = ?1 AND image_id = ?2",
                params![user_id, image_id],
                |row| row.get(0),
            )
            .optional()?;

        let created = match existing {
            None => {
                tx.execute(
                    "INSERT INTO user_saves (user_id, image_id, collection_id) VALUES (?1, ?2, ?3)",
                    params![user_id, image_id, collection_id],
                )?;
                tx.execute(
                    "UPDATE images SET saves = saves + 1 WHERE id = ?1",
                    params![image_id],
                )?;
                true
            }
            Some(current) if current != collection_id => {
                tx.execute(
                    "UPDATE user_saves SET collection_id = ?1 WHERE user_id = ?2 AND image_id = ?3",
                    params![collection_id, user_id, image_id],
                )?;
                false
            }
            Some(_) => false,
        };

        tx.execute(
            "UPDATE images SET collection_id = ?1 WHERE id = ?2 AND user_id = ?3",
            params![collection_id, image_id, user_id],
        )?;

        tx.commit()?;
        Ok(created)
    }

    async fn unsave(&self, user_id: i64, image_id: i64) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let removed = tx.execute(
            "DELETE FROM user_saves WHERE user_id = ?1 AND image_id = ?2",
            params![user_id, image_id],
        )?;
        if removed > 0 {
            tx.execute(
                "UPDATE images SET saves = MAX(saves - 1, 0) WHERE id = ?1",
                params![image_id],
            )?;
        }
        let cleared = tx.execute(
            "UPDATE images SET collection_id = NULL
             WHERE id = ?1 AND user_id = ?2 AND collection_id IS NOT NULL",
            params![image_id, user_id],
        )?;

        tx.commit()?;
        Ok(removed > 0 || cleared > 0)
    }

    async fn is_saved(&self, user_id: i64, image_id: i64) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let saved: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM user_saves WHERE user_id = ?1 AND image_id = ?2)
                 OR EXISTS(SELECT 1 FROM images
                           WHERE id = ?2 AND user_id = ?1 AND collection_id IS NOT NULL)",
            params![user_id, image_id],
            |row| row.get(0),
        )?;
        Ok(saved)
    }
}
