//! # Jukebox Common Library
//!
//! Shared code for the jukebox player and its control tools:
//! - Database models and schema creation
//! - Event types (JukeboxEvent enum) and the EventBus
//! - Configuration file discovery
//! - Utility functions

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
