//! Play history

use crate::error::Result;
use chrono::{DateTime, Utc};
use jukebox_common::db::{HistoryRecord, SongId};
use sqlx::{Pool, Row, Sqlite};

/// Append a history record
pub async fn append_history(
    db: &Pool<Sqlite>,
    song_id: SongId,
    voter: &str,
    played_at: DateTime<Utc>,
    display_name: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO history (song_id, voter, played_at, display_name) VALUES (?, ?, ?, ?)",
    )
    .bind(song_id)
    .bind(voter)
    .bind(played_at)
    .bind(display_name)
    .execute(db)
    .await?;
    Ok(())
}

/// Most recent history records, newest first
pub async fn recent_history(db: &Pool<Sqlite>, limit: i64) -> Result<Vec<HistoryRecord>> {
    let rows = sqlx::query(
        "SELECT id, song_id, voter, played_at, display_name FROM history ORDER BY id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(db)
    .await?;

    Ok(rows
        .iter()
        .map(|row| HistoryRecord {
            id: row.get("id"),
            song_id: row.get("song_id"),
            voter: row.get("voter"),
            played_at: row.get("played_at"),
            display_name: row.get("display_name"),
        })
        .collect())
}
