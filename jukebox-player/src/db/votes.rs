//! Vote queries
//!
//! Votes are written by many concurrent voters. The unique constraint on
//! `(song_id, voter_id, player_id)` is the only coordination between them.

use crate::db::songs::{get_song, song_from_row};
use crate::error::Result;
use chrono::{DateTime, Utc};
use jukebox_common::db::{Song, SongId, Vote};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use std::collections::HashMap;

fn vote_from_row(row: &SqliteRow) -> Vote {
    Vote {
        song_id: row.get("song_id"),
        voter_id: row.get("voter_id"),
        player_id: row.get("player_id"),
        timestamp: row.get::<DateTime<Utc>, _>("voted_at"),
        priority: row.get("priority"),
    }
}

/// Cast a vote.
///
/// The new vote gets the voter's highest priority on this player plus one.
/// Voting twice for the same song is a no-op: returns `Ok(false)` and leaves
/// the existing row and the voter's other priorities untouched.
pub async fn cast_vote(
    db: &Pool<Sqlite>,
    song_id: SongId,
    voter_id: &str,
    player_id: &str,
) -> Result<bool> {
    // Unknown songs are rejected before touching the votes table
    get_song(db, song_id).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO votes (song_id, voter_id, player_id, voted_at, priority)
        SELECT ?, ?, ?, ?, COALESCE(MAX(priority), 0) + 1
        FROM votes
        WHERE voter_id = ? AND player_id = ?
        ON CONFLICT(song_id, voter_id, player_id) DO NOTHING
        "#,
    )
    .bind(song_id)
    .bind(voter_id)
    .bind(player_id)
    .bind(jukebox_common::time::now())
    .bind(voter_id)
    .bind(player_id)
    .execute(db)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// All votes for a player, in the order they were cast
pub async fn list_active_votes(db: &Pool<Sqlite>, player_id: &str) -> Result<Vec<Vote>> {
    let rows = sqlx::query(
        r#"
        SELECT song_id, voter_id, player_id, voted_at, priority
        FROM votes
        WHERE player_id = ?
        ORDER BY voted_at, priority, rowid
        "#,
    )
    .bind(player_id)
    .fetch_all(db)
    .await?;

    Ok(rows.iter().map(vote_from_row).collect())
}

/// Votes for a player together with the songs they reference.
///
/// Read in a single statement so the two halves always agree even while
/// voters are writing.
pub async fn load_vote_snapshot(
    db: &Pool<Sqlite>,
    player_id: &str,
) -> Result<(Vec<Vote>, HashMap<SongId, Song>)> {
    let rows = sqlx::query(
        r#"
        SELECT v.song_id, v.voter_id, v.player_id, v.voted_at, v.priority,
               s.path, s.artist, s.album, s.title, s.length, s.track, s.online
        FROM votes v
        JOIN songs s ON s.song_id = v.song_id
        WHERE v.player_id = ?
        ORDER BY v.voted_at, v.priority, v.rowid
        "#,
    )
    .bind(player_id)
    .fetch_all(db)
    .await?;

    let mut votes = Vec::with_capacity(rows.len());
    let mut songs = HashMap::new();
    for row in &rows {
        let vote = vote_from_row(row);
        songs.entry(vote.song_id).or_insert_with(|| song_from_row(row));
        votes.push(vote);
    }

    Ok((votes, songs))
}

/// Voters currently supporting a song on a player
pub async fn voters_for_song(
    db: &Pool<Sqlite>,
    player_id: &str,
    song_id: SongId,
) -> Result<Vec<String>> {
    let voters = sqlx::query_scalar(
        "SELECT voter_id FROM votes WHERE player_id = ? AND song_id = ? ORDER BY voted_at, rowid",
    )
    .bind(player_id)
    .bind(song_id)
    .fetch_all(db)
    .await?;

    Ok(voters)
}

/// Remove every vote for a played song on a player
pub async fn clear_votes(db: &Pool<Sqlite>, player_id: &str, song_id: SongId) -> Result<u64> {
    let result = sqlx::query("DELETE FROM votes WHERE player_id = ? AND song_id = ?")
        .bind(player_id)
        .bind(song_id)
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}
