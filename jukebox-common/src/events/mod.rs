//! Event types for the jukebox event system
//!
//! Provides shared event definitions and the EventBus used by the player
//! supervisor to publish its lifecycle.

mod playback_types;

pub use playback_types::{EndReason, SupervisorState};

use crate::db::SongId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Jukebox event types
///
/// Events are broadcast via EventBus and can be serialized for external
/// consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JukeboxEvent {
    /// Supervisor moved between lifecycle states
    SupervisorStateChanged {
        player_id: String,
        old_state: SupervisorState,
        new_state: SupervisorState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A song was handed to a freshly spawned player process
    SongStarted {
        player_id: String,
        song_id: SongId,
        display_name: String,
        /// OS pid of the player process, if it was still running
        process_id: Option<u32>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A started song ended. Emitted exactly once per `SongStarted`.
    SongEnded {
        player_id: String,
        song_id: SongId,
        reason: EndReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A queue candidate was passed over because its resource is unreachable
    CandidateSkipped {
        player_id: String,
        song_id: SongId,
        detail: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Volume changed through the control surface
    VolumeChanged {
        player_id: String,
        volume: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast bus for JukeboxEvent
///
/// Shared behind an `Arc`. Slow subscribers lose the oldest events once
/// the channel capacity is exceeded.
pub struct EventBus {
    tx: broadcast::Sender<JukeboxEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<JukeboxEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: JukeboxEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
