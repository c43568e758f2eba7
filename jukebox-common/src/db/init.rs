//! Database initialization
//!
//! Creates the database file on first run and makes sure every table the
//! player needs exists. All statements are idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // Voters, the supervisor and remote control tools write concurrently
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_songs_table(pool).await?;
    create_votes_table(pool).await?;
    create_voter_order_table(pool).await?;
    create_history_table(pool).await?;
    create_player_runtime_table(pool).await?;
    create_player_commands_table(pool).await?;
    Ok(())
}

async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            song_id INTEGER PRIMARY KEY AUTOINCREMENT,
            path TEXT NOT NULL UNIQUE,
            artist TEXT NOT NULL DEFAULT '',
            album TEXT NOT NULL DEFAULT '',
            title TEXT NOT NULL DEFAULT '',
            length INTEGER NOT NULL DEFAULT 0,
            track INTEGER NOT NULL DEFAULT 0,
            online INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_songs_online ON songs(online)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_votes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS votes (
            song_id INTEGER NOT NULL REFERENCES songs(song_id) ON DELETE CASCADE,
            voter_id TEXT NOT NULL,
            player_id TEXT NOT NULL,
            voted_at TIMESTAMP NOT NULL,
            priority INTEGER NOT NULL,
            UNIQUE(song_id, voter_id, player_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_votes_player ON votes(player_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_voter_order_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS voter_order (
            player_id TEXT NOT NULL,
            voter_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (player_id, voter_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            song_id INTEGER NOT NULL,
            voter TEXT NOT NULL DEFAULT '',
            played_at TIMESTAMP NOT NULL,
            display_name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_player_runtime_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS player_runtime (
            player_id TEXT PRIMARY KEY,
            instance_id TEXT NOT NULL,
            local_process_id INTEGER NOT NULL,
            volume INTEGER NOT NULL,
            current_song_id INTEGER,
            song_start_time TIMESTAMP,
            started_at TIMESTAMP NOT NULL,
            superseded INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_player_commands_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS player_commands (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_id TEXT NOT NULL,
            command TEXT NOT NULL,
            argument TEXT,
            created_at TIMESTAMP NOT NULL,
            status TEXT,
            detail TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
