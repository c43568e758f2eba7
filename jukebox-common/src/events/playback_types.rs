//! Playback-related type definitions
//!
//! Supporting types for supervisor state and song lifecycle.

use serde::{Deserialize, Serialize};

/// Supervisor lifecycle state
///
/// `Stopped → Starting → Playing ⇄ Paused → Stopping → Stopped`, with
/// `Crashed → Starting` when the child dies unexpectedly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SupervisorState {
    Stopped,
    Starting,
    Playing,
    Paused,
    Stopping,
    Crashed,
}

impl SupervisorState {
    /// Whether a song's child process is running in this state
    pub fn has_child(&self) -> bool {
        matches!(self, SupervisorState::Playing | SupervisorState::Paused)
    }
}

impl std::fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupervisorState::Stopped => write!(f, "stopped"),
            SupervisorState::Starting => write!(f, "starting"),
            SupervisorState::Playing => write!(f, "playing"),
            SupervisorState::Paused => write!(f, "paused"),
            SupervisorState::Stopping => write!(f, "stopping"),
            SupervisorState::Crashed => write!(f, "crashed"),
        }
    }
}

/// Why a played song ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// Played to the end
    Complete,
    /// Skipped on request
    Skip,
    /// Player stopped on request; the song should be retried
    Stop,
    /// Child process died unexpectedly
    Crash,
}

impl EndReason {
    /// Whether the song counts as played: votes cleared, history appended,
    /// contributing voters rotated to the back of the turn order.
    ///
    /// A stopped song did not finish and a crashed song must stay eligible
    /// for immediate retry, so neither counts.
    pub fn counts_as_played(&self) -> bool {
        matches!(self, EndReason::Complete | EndReason::Skip)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Complete => "complete",
            EndReason::Skip => "skip",
            EndReason::Stop => "stop",
            EndReason::Crash => "crash",
        }
    }
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
