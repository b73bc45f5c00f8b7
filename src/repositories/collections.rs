use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row, TransactionBehavior};

use crate::db::models::{Collection, NewCollection};
use crate::pagination::PageRequest;
use crate::repositories::RepositoryError;
use crate::state::DbPool;

// Membership is the union of images filed here by their owner
// (images.collection_id) and images saved here (user_saves).
const COLLECTION_SELECT: &str = "SELECT c.id, c.name, c.description, c.category, c.user_id,
        c.created_at, c.updated_at,
        (SELECT COUNT(*) FROM images i
          WHERE i.collection_id = c.id
             OR i.id IN (SELECT s.image_id FROM user_saves s WHERE s.collection_id = c.id)
        ) AS images_count,
        (SELECT i.url FROM images i
          WHERE i.collection_id = c.id
             OR i.id IN (SELECT s.image_id FROM user_saves s WHERE s.collection_id = c.id)
          ORDER BY i.created_at DESC, i.id DESC
          LIMIT 1
        ) AS cover_image
     FROM collections c";

#[async_trait]
pub trait CollectionRepository: Send + Sync {
    /// One page, newest first, optionally restricted to one owner.
    async fn list(
        &self,
        owner: Option<i64>,
        page: PageRequest,
    ) -> Result<(Vec<Collection>, i64), RepositoryError>;

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Collection>, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Collection>, RepositoryError>;

    async fn insert(&self, collection: &NewCollection) -> Result<Collection, RepositoryError>;

    async fn update(&self, collection: &Collection) -> Result<Option<Collection>, RepositoryError>;

    /// Deletes the collection. Filed images keep their row (the foreign key
    /// nulls out); saves into it are dropped and their counters lowered.
    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;
}

pub struct SqliteCollectionRepository {
    pool: DbPool,
}

impl SqliteCollectionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn row_to_collection(row: &Row) -> Result<Collection, rusqlite::Error> {
        Ok(Collection {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            category: row.get(3)?,
            user_id: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            images_count: row.get(7)?,
            cover_image: row.get(8)?,
        })
    }

    fn find(conn: &rusqlite::Connection, id: i64) -> Result<Option<Collection>, rusqlite::Error> {
        conn.query_row(
            &format!("{} WHERE c.id = ?1", COLLECTION_SELECT),
            params![id],
            Self::row_to_collection,
        )
        .optional()
    }
}

#[async_trait]
impl CollectionRepository for SqliteCollectionRepository {
    async fn list(
        &self,
        owner: Option<i64>,
        page: PageRequest,
    ) -> Result<(Vec<Collection>, i64), RepositoryError> {
        let conn = self.pool.get()?;

        let mut values = Vec::new();
        let where_sql = match owner {
            Some(user_id) => {
                values.push(Value::Integer(user_id));
                " WHERE c.user_id = ?1"
            }
            None => "",
        };

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM collections c{}", where_sql),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        values.push(Value::Integer(page.limit as i64));
        values.push(Value::Integer(page.offset()));
        let sql = format!(
            "{}{} ORDER BY c.created_at DESC, c.id DESC LIMIT ?{} OFFSET ?{}",
            COLLECTION_SELECT,
            where_sql,
            values.len() - 1,
            values.len()
        );

        let mut stmt = conn.prepare(&sql)?;
        let collections = stmt
            .query_map(params_from_iter(values.iter()), Self::row_to_collection)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((collections, total))
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Collection>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE c.user_id = ?1 ORDER BY c.created_at DESC, c.id DESC",
            COLLECTION_SELECT
        ))?;
        let collections = stmt
            .query_map(params![user_id], Self::row_to_collection)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(collections)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Collection>, RepositoryError> {
        let conn = self.pool.get()?;
        Ok(Self::find(&conn, id)?)
    }

    async fn insert(&self, collection: &NewCollection) -> Result<Collection, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO collections (name, description, category, user_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                collection.name,
                collection.description,
                collection.category,
                collection.user_id
            ],
        )?;
        let id = conn.last_insert_rowid();
        Self::find(&conn, id)?.ok_or(RepositoryError::Sql(rusqlite::Error::QueryReturnedNoRows))
    }

    async fn update(&self, collection: &Collection) -> Result<Option<Collection>, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE collections
             SET name = ?1, description = ?2, category = ?3, updated_at = datetime('now')
             WHERE id = ?4",
            params![
                collection.name,
                collection.description,
                collection.category,
                collection.id
            ],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        Ok(Self::find(&conn, collection.id)?)
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "UPDATE images SET saves = MAX(saves - 1, 0)
             WHERE id IN (SELECT image_id FROM user_saves WHERE collection_id = ?1)",
            params![id],
        )?;
        let rows = tx.execute("DELETE FROM collections WHERE id = ?1", params![id])?;

        tx.commit()?;
        Ok(rows > 0)
    }
}
