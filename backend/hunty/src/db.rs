//! Database layer: pool setup, key/value documents and progress rows.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::info;

use crate::errors::Result;
use crate::registration::PlayerProgress;

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

/// Single-connection in-memory pool; every connection would otherwise get
/// its own empty database.
#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

// ─────────────────────────────────────────────────────────
// Key/value documents
// ─────────────────────────────────────────────────────────

/// Read a stored document. `None` when the key has never been written.
pub async fn kv_get<'e, E>(executor: E, key: &str) -> Result<Option<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?1")
        .bind(key)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(|(v,)| v))
}

/// Insert or replace a stored document.
pub async fn kv_put<'e, E>(executor: E, key: &str, value: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO kv_store (key, value, updated_at)
        VALUES (?1, ?2, strftime('%s', 'now'))
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(executor)
    .await?;
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Player progress
// ─────────────────────────────────────────────────────────

pub async fn get_progress(
    pool: &SqlitePool,
    hunt_id: u64,
    player: &str,
) -> Result<Option<PlayerProgress>> {
    let row: Option<(i64, String, i64, bool)> = sqlx::query_as(
        r#"
        SELECT hunt_id, player, current_clue_index, completed
        FROM   player_progress
        WHERE  hunt_id = ?1 AND player = ?2
        "#,
    )
    .bind(hunt_id as i64)
    .bind(player)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(hunt_id, player, index, completed)| PlayerProgress {
        hunt_id: hunt_id as u64,
        player,
        current_clue_index: index.max(0) as u32,
        completed,
    }))
}

/// Create a fresh progress row. Existing rows are left untouched.
/// Returns whether a row was inserted.
pub async fn insert_progress(pool: &SqlitePool, hunt_id: u64, player: &str) -> Result<bool> {
    let rows = sqlx::query(
        r#"
        INSERT OR IGNORE INTO player_progress (hunt_id, player)
        VALUES (?1, ?2)
        "#,
    )
    .bind(hunt_id as i64)
    .bind(player)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows > 0)
}
