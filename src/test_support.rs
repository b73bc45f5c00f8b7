//! Throwaway databases and seed rows shared by the unit tests.

use rusqlite::params;
use tempfile::TempDir;

use crate::db;
use crate::state::DbPool;

/// Migrated database in a temp dir. Keep the `TempDir` alive for the test.
pub fn test_pool() -> (DbPool, TempDir) {
    let tmp = TempDir::new().unwrap();
    let pool = db::create_pool(&tmp.path().join("test.db"), 4).unwrap();
    db::run_migrations(&pool).unwrap();
    (pool, tmp)
}

pub fn seed_user(pool: &DbPool, username: &str) -> i64 {
    let conn = pool.get().unwrap();
    conn.execute(
        "INSERT INTO users (username, email, password_hash) VALUES (?1, ?2, 'not-a-hash')",
        params![username, format!("{}@example.com", username)],
    )
    .unwrap();
    conn.last_insert_rowid()
}

pub fn seed_image(pool: &DbPool, user_id: i64, title: &str, category: &str) -> i64 {
    let conn = pool.get().unwrap();
    conn.execute(
        "INSERT INTO images (url, title, category, user_id) VALUES (?1, ?2, ?3, ?4)",
        params![format!("/uploads/{}.png", title), title, category, user_id],
    )
    .unwrap();
    conn.last_insert_rowid()
}

pub fn seed_collection(pool: &DbPool, user_id: i64, name: &str) -> i64 {
    let conn = pool.get().unwrap();
    conn.execute(
        "INSERT INTO collections (name, user_id) VALUES (?1, ?2)",
        params![name, user_id],
    )
    .unwrap();
    conn.last_insert_rowid()
}

pub fn image_counters(pool: &DbPool, image_id: i64) -> (i64, i64) {
    let conn = pool.get().unwrap();
    conn.query_row(
        "SELECT likes, saves FROM images WHERE id = ?1",
        params![image_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .unwrap()
}
