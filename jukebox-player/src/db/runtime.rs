//! Player runtime state
//!
//! One row per live supervisor. Rows are written only by the supervisor
//! that owns them (matched by `instance_id`), except `zap` which deletes a
//! stale row outright and a starting supervisor which marks the previous
//! owner's row `superseded` and waits for it to go away.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use jukebox_common::db::{PlayerRuntimeState, SongId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

/// Get the runtime state for a player, if a supervisor registered one
pub async fn get_player_runtime_state(
    db: &Pool<Sqlite>,
    player_id: &str,
) -> Result<Option<PlayerRuntimeState>> {
    let row = sqlx::query("SELECT * FROM player_runtime WHERE player_id = ?")
        .bind(player_id)
        .fetch_optional(db)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let instance_id = Uuid::parse_str(&row.get::<String, _>("instance_id"))
        .map_err(|e| Error::Internal(format!("Invalid instance UUID: {}", e)))?;

    Ok(Some(PlayerRuntimeState {
        player_id: row.get("player_id"),
        instance_id,
        local_process_id: column_u32(&row, "local_process_id")?,
        volume: column_u32(&row, "volume")?,
        current_song_id: row.get("current_song_id"),
        song_start_time: row.get::<Option<DateTime<Utc>>, _>("song_start_time"),
        started_at: row.get("started_at"),
        superseded: row.get("superseded"),
    }))
}

fn column_u32(row: &SqliteRow, column: &str) -> Result<u32> {
    let value = row.get::<i64, _>(column);
    u32::try_from(value).map_err(|_| Error::Internal(format!("Invalid {} in player_runtime: {}", column, value)))
}

/// Insert or replace the runtime state row for `state.player_id`
pub async fn upsert_player_runtime_state(db: &Pool<Sqlite>, state: &PlayerRuntimeState) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO player_runtime
            (player_id, instance_id, local_process_id, volume, current_song_id, song_start_time, started_at, superseded)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(player_id) DO UPDATE SET
            instance_id = excluded.instance_id,
            local_process_id = excluded.local_process_id,
            volume = excluded.volume,
            current_song_id = excluded.current_song_id,
            song_start_time = excluded.song_start_time,
            started_at = excluded.started_at,
            superseded = excluded.superseded
        "#,
    )
    .bind(&state.player_id)
    .bind(state.instance_id.to_string())
    .bind(state.local_process_id as i64)
    .bind(state.volume as i64)
    .bind(state.current_song_id)
    .bind(state.song_start_time)
    .bind(state.started_at)
    .bind(state.superseded)
    .execute(db)
    .await?;
    Ok(())
}

/// Delete the runtime state for a player regardless of owner.
///
/// Returns true if a row existed.
pub async fn delete_player_runtime_state(db: &Pool<Sqlite>, player_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM player_runtime WHERE player_id = ?")
        .bind(player_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete the runtime state only if `instance_id` still owns it
pub async fn delete_owned_runtime_state(
    db: &Pool<Sqlite>,
    player_id: &str,
    instance_id: Uuid,
) -> Result<bool> {
    let result = sqlx::query("DELETE FROM player_runtime WHERE player_id = ? AND instance_id = ?")
        .bind(player_id)
        .bind(instance_id.to_string())
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Ask the supervisor `instance_id` to give up `player_id`.
///
/// Returns false if that instance no longer owns the row.
pub async fn mark_superseded(db: &Pool<Sqlite>, player_id: &str, instance_id: Uuid) -> Result<bool> {
    let result = sqlx::query("UPDATE player_runtime SET superseded = 1 WHERE player_id = ? AND instance_id = ?")
        .bind(player_id)
        .bind(instance_id.to_string())
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Record the song the owned player is currently instructed to play.
///
/// `None` clears both the song and its start time.
pub async fn set_current_song(
    db: &Pool<Sqlite>,
    player_id: &str,
    instance_id: Uuid,
    song: Option<(SongId, DateTime<Utc>)>,
) -> Result<()> {
    let (song_id, started) = match song {
        Some((song_id, started)) => (Some(song_id), Some(started)),
        None => (None, None),
    };

    sqlx::query(
        r#"
        UPDATE player_runtime
        SET current_song_id = ?, song_start_time = ?
        WHERE player_id = ? AND instance_id = ?
        "#,
    )
    .bind(song_id)
    .bind(started)
    .bind(player_id)
    .bind(instance_id.to_string())
    .execute(db)
    .await?;
    Ok(())
}

/// Persist a new volume for the owned player
pub async fn set_volume(db: &Pool<Sqlite>, player_id: &str, instance_id: Uuid, volume: u32) -> Result<()> {
    sqlx::query("UPDATE player_runtime SET volume = ? WHERE player_id = ? AND instance_id = ?")
        .bind(volume as i64)
        .bind(player_id)
        .bind(instance_id.to_string())
        .execute(db)
        .await?;
    Ok(())
}
