//! Database access layer
//!
//! Queries for songs, votes, voter order, history, player runtime state and
//! the remote command queue. Tables are created by `jukebox_common::db`.

pub mod commands;
pub mod history;
pub mod runtime;
pub mod songs;
pub mod voter_order;
pub mod votes;
