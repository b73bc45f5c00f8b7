use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row, TransactionBehavior};

use crate::db::models::{Author, Category, Image, NewImage};
use crate::pagination::PageRequest;
use crate::repositories::{escape_like, RepositoryError};
use crate::state::DbPool;

const IMAGE_SELECT: &str = "SELECT i.id, i.url, i.title, i.description, i.link, i.category,
        i.likes, i.saves, i.user_id, i.collection_id, i.created_at, i.updated_at,
        u.username, u.profile_image
     FROM images i
     JOIN users u ON u.id = i.user_id";

/// Filters for the paginated listings. All present filters must match.
#[derive(Debug, Clone, Default)]
pub struct ImageFilter {
    pub category: Option<Category>,
    /// Substring of the title or the description.
    pub search: Option<String>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrder {
    Newest,
    /// `likes + saves`, recency breaks ties.
    Popular,
}

impl ImageOrder {
    fn sql(&self) -> &'static str {
        match self {
            ImageOrder::Newest => "i.created_at DESC, i.id DESC",
            ImageOrder::Popular => "(i.likes + i.saves) DESC, i.created_at DESC, i.id DESC",
        }
    }
}

#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// One page plus the total row count for the same filter.
    async fn list(
        &self,
        filter: &ImageFilter,
        order: ImageOrder,
        page: PageRequest,
    ) -> Result<(Vec<Image>, i64), RepositoryError>;

    /// Members of a collection: filed there by their owner or saved there by
    /// the collection's owner.
    async fn list_in_collection(&self, collection_id: i64) -> Result<Vec<Image>, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Image>, RepositoryError>;

    async fn insert(&self, image: &NewImage) -> Result<Image, RepositoryError>;

    /// Writes every mutable column of `image`. `None` if the row is gone.
    /// The owner's own save row follows `collection_id`: it moves with the
    /// image, or is dropped (with the `saves` counter) when filing is cleared.
    async fn update(&self, image: &Image) -> Result<Option<Image>, RepositoryError>;

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;
}

pub struct SqliteImageRepository {
    pool: DbPool,
}

impl SqliteImageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub(crate) fn row_to_image(row: &Row) -> Result<Image, rusqlite::Error> {
        let user_id: i64 = row.get(8)?;
        Ok(Image {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            link: row.get(4)?,
            category: row.get(5)?,
            likes: row.get(6)?,
            saves: row.get(7)?,
            user_id,
            collection_id: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
            user: Author {
                id: user_id,
                username: row.get(12)?,
                profile_image: row.get(13)?,
            },
            is_liked: false,
            is_saved: false,
        })
    }

    fn find(conn: &rusqlite::Connection, id: i64) -> Result<Option<Image>, rusqlite::Error> {
        conn.query_row(
            &format!("{} WHERE i.id = ?1", IMAGE_SELECT),
            params![id],
            Self::row_to_image,
        )
        .optional()
    }
}

/// Builds the WHERE clause and its positional values for a filter.
fn filter_clause(filter: &ImageFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if let Some(category) = filter.category {
        values.push(Value::Text(category.as_str().to_string()));
        clauses.push(format!("i.category = ?{}", values.len()));
    }
    if let Some(term) = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        values.push(Value::Text(format!("%{}%", escape_like(term))));
        let n = values.len();
        clauses.push(format!(
            "(i.title LIKE ?{n} ESCAPE '\\' OR i.description LIKE ?{n} ESCAPE '\\')"
        ));
    }
    if let Some(user_id) = filter.user_id {
        values.push(Value::Integer(user_id));
        clauses.push(format!("i.user_id = ?{}", values.len()));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

#[async_trait]
impl ImageRepository for SqliteImageRepository {
    async fn list(
        &self,
        filter: &ImageFilter,
        order: ImageOrder,
        page: PageRequest,
    ) -> Result<(Vec<Image>, i64), RepositoryError> {
        let conn = self.pool.get()?;
        let (where_sql, mut values) = filter_clause(filter);

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM images i{}", where_sql),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        values.push(Value::Integer(page.limit as i64));
        values.push(Value::Integer(page.offset()));
        let sql = format!(
            "{}{} ORDER BY {} LIMIT ?{} OFFSET ?{}",
            IMAGE_SELECT,
            where_sql,
            order.sql(),
            values.len() - 1,
            values.len()
        );

        let mut stmt = conn.prepare(&sql)?;
        let images = stmt
            .query_map(params_from_iter(values.iter()), Self::row_to_image)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((images, total))
    }

    async fn list_in_collection(&self, collection_id: i64) -> Result<Vec<Image>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE i.collection_id = ?1
                OR i.id IN (SELECT s.image_id FROM user_saves s WHERE s.collection_id = ?1)
             ORDER BY i.created_at DESC, i.id DESC",
            IMAGE_SELECT
        ))?;
        let images = stmt
            .query_map(params![collection_id], Self::row_to_image)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(images)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Image>, RepositoryError> {
        let conn = self.pool.get()?;
        Ok(Self::find(&conn, id)?)
    }

    async fn insert(&self, image: &NewImage) -> Result<Image, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO images (url, title, description, link, category, user_id, collection_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                image.url,
                image.title,
                image.description,
                image.link,
                image.category,
                image.user_id,
                image.collection_id
            ],
        )?;
        let id = conn.last_insert_rowid();
        Self::find(&conn, id)?.ok_or(RepositoryError::Sql(rusqlite::Error::QueryReturnedNoRows))
    }

    async fn update(&self, image: &Image) -> Result<Option<Image>, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let rows = tx.execute(
            "UPDATE images
             SET title = ?1, description = ?2, link = ?3, category = ?4, collection_id = ?5,
                 updated_at = datetime('now')
             WHERE id = ?6",
            params![
                image.title,
                image.description,
                image.link,
                image.category,
                image.collection_id,
                image.id
            ],
        )?;
        if rows == 0 {
            return Ok(None);
        }

        match image.collection_id {
            Some(collection_id) => {
                tx.execute(
                    "UPDATE user_saves SET collection_id = ?1 WHERE user_id = ?2 AND image_id = ?3",
                    params![collection_id, image.user_id, image.id],
                )?;
            }
            None => {
                let removed = tx.execute(
                    "DELETE FROM user_saves WHERE user_id = ?1 AND image_id = ?2",
                    params![image.user_id, image.id],
                )?;
                if removed > 0 {
                    tx.execute(
                        "UPDATE images SET saves = MAX(saves - 1, 0) WHERE id = ?1",
                        params![image.id],
                    )?;
                }
            }
        }

        let updated = Self::find(&tx, image.id)?;
        tx.commit()?;
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM images WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}
