//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Song identity (SQLite rowid)
pub type SongId = i64;

/// A playable song.
///
/// Immutable once created except for `online`, which tracks whether the
/// backing resource is currently reachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub song_id: SongId,
    /// Playable resource locator (file path or URL)
    pub path: String,
    pub artist: String,
    pub album: String,
    pub title: String,
    /// Length in seconds
    pub length: i64,
    pub track: i64,
    pub online: bool,
}

impl Song {
    /// Name recorded in history and passed to hooks
    pub fn display_name(&self) -> String {
        match (self.artist.is_empty(), self.title.is_empty()) {
            (false, false) => format!("{} - {}", self.artist, self.title),
            (true, false) => self.title.clone(),
            _ => self.path.clone(),
        }
    }
}

/// One voter's vote for a song on a player instance.
///
/// Unique per `(song_id, voter_id, player_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub song_id: SongId,
    pub voter_id: String,
    pub player_id: String,
    pub timestamp: DateTime<Utc>,
    /// Per-voter ordinal, strictly increasing in vote order
    pub priority: i64,
}

/// Live state of one supervisor instance.
///
/// At most one row per `player_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRuntimeState {
    pub player_id: String,
    /// Identifies the supervisor instance owning the row
    pub instance_id: Uuid,
    /// OS process id of the supervisor owning the row
    pub local_process_id: u32,
    pub volume: u32,
    pub current_song_id: Option<SongId>,
    pub song_start_time: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    /// Set by a newer supervisor waiting to take over `player_id`
    pub superseded: bool,
}

/// A played song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: i64,
    pub song_id: SongId,
    pub voter: String,
    pub played_at: DateTime<Utc>,
    pub display_name: String,
}
