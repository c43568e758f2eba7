//! Errors raised while opening the jukebox database or reading config

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Schema creation or a pragma failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Config file unreadable or database directory not creatable
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file present but not valid TOML for the requested type
    #[error("Configuration error: {0}")]
    Config(String),
}
