//! Playback supervision
//!
//! [`PlayerSupervisor`] runs the control loop for one `player_id`: it picks
//! the next song from the fair queue, spawns the backend through
//! [`process::PlayerProcess`], tracks the song with a [`PlaybackSession`]
//! and answers control requests.

pub mod control;
pub mod crash_tracker;
pub mod process;
pub mod session;
pub mod supervisor;

pub use control::{parse_volume, zap, ControlRequest, PauseOutcome, RemoteControl, SupervisorHandle};
pub use crash_tracker::CrashTracker;
pub use process::PlayerProcess;
pub use session::{PlaybackSession, SessionSummary};
pub use supervisor::PlayerSupervisor;

use crate::hooks::HookRegistry;
use jukebox_common::events::EventBus;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use uuid::Uuid;

/// Everything a session needs to record transitions for one supervisor
pub struct PlayerContext {
    pub db: Pool<Sqlite>,
    pub hooks: Arc<HookRegistry>,
    pub events: Arc<EventBus>,
    pub player_id: String,
    /// Identifies this supervisor's runtime row
    pub instance_id: Uuid,
}
