//! Song queries

use crate::error::{Error, Result};
use jukebox_common::db::{Song, SongId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

/// Fields for a song that does not exist yet
#[derive(Debug, Clone, Default)]
pub struct NewSong {
    pub path: String,
    pub artist: String,
    pub album: String,
    pub title: String,
    pub length: i64,
    pub track: i64,
}

pub(crate) fn song_from_row(row: &SqliteRow) -> Song {
    Song {
        song_id: row.get("song_id"),
        path: row.get("path"),
        artist: row.get("artist"),
        album: row.get("album"),
        title: row.get("title"),
        length: row.get("length"),
        track: row.get("track"),
        online: row.get("online"),
    }
}

/// Insert a song, returning it with its assigned id
pub async fn insert_song(db: &Pool<Sqlite>, song: &NewSong) -> Result<Song> {
    if song.path.trim().is_empty() {
        return Err(Error::InvalidArgument("song path must not be empty".to_string()));
    }

    let song_id: SongId = sqlx::query_scalar(
        r#"
        INSERT INTO songs (path, artist, album, title, length, track, online)
        VALUES (?, ?, ?, ?, ?, ?, 1)
        RETURNING song_id
        "#,
    )
    .bind(&song.path)
    .bind(&song.artist)
    .bind(&song.album)
    .bind(&song.title)
    .bind(song.length)
    .bind(song.track)
    .fetch_one(db)
    .await?;

    get_song(db, song_id).await
}

/// Get a song by id
pub async fn get_song(db: &Pool<Sqlite>, song_id: SongId) -> Result<Song> {
    let row = sqlx::query("SELECT * FROM songs WHERE song_id = ?")
        .bind(song_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::InvalidArgument(format!("unknown song {}", song_id)))?;

    Ok(song_from_row(&row))
}

/// Mark a song's resource reachable or unreachable
pub async fn set_song_online(db: &Pool<Sqlite>, song_id: SongId, online: bool) -> Result<()> {
    sqlx::query("UPDATE songs SET online = ? WHERE song_id = ?")
        .bind(online)
        .bind(song_id)
        .execute(db)
        .await?;
    Ok(())
}

/// Pick any online song at random, excluding `exclude`
pub async fn find_playable_song(db: &Pool<Sqlite>, exclude: &[SongId]) -> Result<Option<Song>> {
    let mut query = sqlx::QueryBuilder::<Sqlite>::new("SELECT * FROM songs WHERE online = 1");
    if !exclude.is_empty() {
        query.push(" AND song_id NOT IN (");
        let mut separated = query.separated(", ");
        for song_id in exclude {
            separated.push_bind(*song_id);
        }
        separated.push_unseparated(")");
    }
    query.push(" ORDER BY RANDOM() LIMIT 1");

    let row = query.build().fetch_optional(db).await?;
    Ok(row.as_ref().map(song_from_row))
}

/// Songs currently marked unreachable
pub async fn list_offline_songs(db: &Pool<Sqlite>) -> Result<Vec<Song>> {
    let rows = sqlx::query("SELECT * FROM songs WHERE online = 0 ORDER BY song_id")
        .fetch_all(db)
        .await?;
    Ok(rows.iter().map(song_from_row).collect())
}
