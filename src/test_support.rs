//! Helpers for tests that need a real PostgreSQL database.
//!
//! These tests only run when `DATABASE_URL` points at a disposable database;
//! otherwise they return early. Every test creates its own users, so they can
//! share one schema and run in parallel.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::auth::generate_token;
use crate::db_utils::create_tables;
use crate::models::User;
use crate::repo;

const SCHEMA_LOCK_KEY: i64 = 0x6865_616c_696f;

pub async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .unwrap();

    // Concurrent CREATE ... IF NOT EXISTS can still collide in the catalog.
    let mut lock = pool.acquire().await.unwrap();
    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *lock)
        .await
        .unwrap();
    create_tables(&pool).await.unwrap();
    sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *lock)
        .await
        .unwrap();
    drop(lock);

    Some(pool)
}

pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", generate_token().to_lowercase())
}

pub async fn test_user(pool: &PgPool) -> User {
    repo::create_user(pool, "Test Patient", &unique_email("patient"), "!test", false)
        .await
        .unwrap()
}
