use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};

use crate::db::models::User;
use crate::repositories::{unique_violation, RepositoryError};
use crate::state::DbPool;

const USER_SELECT: &str = "SELECT id, username, email, password_hash, profile_image, bio,
        created_at, updated_at
     FROM users";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    /// Fails with `RepositoryError::Conflict("email" | "username")` on duplicates.
    async fn insert(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    /// Writes username, bio and profile image.
    async fn update(&self, user: &User) -> Result<Option<User>, RepositoryError>;

    /// Deletes the user and everything they own; counters on other users'
    /// images drop by the likes and saves that disappear with them.
    /// Returns the urls of the images that went with the account, or `None`
    /// if there was no such user.
    async fn delete(&self, id: i64) -> Result<Option<Vec<String>>, RepositoryError>;
}

pub struct SqliteUserRepository {
    pool: DbPool,
}

impl SqliteUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: &Row) -> Result<User, rusqlite::Error> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            profile_image: row.get(4)?,
            bio: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn find_one(
        &self,
        column: &str,
        value: &dyn rusqlite::ToSql,
    ) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                &format!("{} WHERE {} = ?1", USER_SELECT, column),
                [value],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        self.find_one("id", &id)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.find_one("email", &email)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        self.find_one("username", &username)
    }

    async fn insert(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let id = {
            let conn = self.pool.get()?;
            conn.execute(
                "INSERT INTO users (username, email, password_hash) VALUES (?1, ?2, ?3)",
                params![username, email, password_hash],
            )
            .map_err(unique_violation)?;
            conn.last_insert_rowid()
        };
        self.find_one("id", &id)?
            .ok_or(RepositoryError::Sql(rusqlite::Error::QueryReturnedNoRows))
    }

    async fn update(&self, user: &User) -> Result<Option<User>, RepositoryError> {
        let rows = {
            let conn = self.pool.get()?;
            conn.execute(
                "UPDATE users
                 SET username = ?1, bio = ?2, profile_image = ?3, updated_at = datetime('now')
                 WHERE id = ?4",
                params![user.username, user.bio, user.profile_image, user.id],
            )
            .map_err(unique_violation)?
        };
        if rows == 0 {
            return Ok(None);
        }
        self.find_one("id", &user.id)
    }

    async fn delete(&self, id: i64) -> Result<Option<Vec<String>>, RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let urls = {
            let mut stmt = tx.prepare("SELECT url FROM images WHERE user_id = ?1")?;
            let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        tx.execute(
            "UPDATE images SET likes = MAX(likes - 1, 0)
             WHERE id IN (SELECT image_id FROM likes WHERE user_id = ?1)",
            params![id],
        )?;
        tx.execute(
            "UPDATE images SET saves = MAX(saves - 1, 0)
             WHERE id IN (SELECT image_id FROM user_saves WHERE user_id = ?1)",
            params![id],
        )?;
        let rows = tx.execute("DELETE FROM users WHERE id = ?1", params![id])?;

        tx.commit()?;
        Ok((rows > 0).then_some(urls))
    }
}
