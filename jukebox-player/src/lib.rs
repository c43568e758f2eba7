//! # Jukebox Player Library (jukebox-player)
//!
//! Collaborative jukebox playback: voters queue songs, the fair queue
//! interleaves them round-robin across voters, and a supervisor drives an
//! external player process through the resulting order.
//!
//! **Architecture:** one [`playback::PlayerSupervisor`] control loop per
//! `player_id`, controlled in-process through a
//! [`playback::SupervisorHandle`] or from other processes through
//! [`playback::RemoteControl`].

pub mod config;
pub mod db;
pub mod error;
pub mod hooks;
pub mod playback;
pub mod queue;

pub use error::{Error, Result};
