//! Remote command queue
//!
//! Control tools running in another process insert rows here; the owning
//! supervisor polls, executes them through its control channel and writes
//! the outcome back into `status` / `detail`.

use crate::error::Result;
use sqlx::{Pool, Row, Sqlite};

/// A command waiting to be executed by a supervisor
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommand {
    pub id: i64,
    pub command: String,
    pub argument: Option<String>,
}

/// Outcome written back by the supervisor
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    pub status: String,
    pub detail: Option<String>,
}

/// Queue a command for a player, returning its id
pub async fn enqueue_command(
    db: &Pool<Sqlite>,
    player_id: &str,
    command: &str,
    argument: Option<&str>,
) -> Result<i64> {
    let id = sqlx::query_scalar(
        r#"
        INSERT INTO player_commands (player_id, command, argument, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(player_id)
    .bind(command)
    .bind(argument)
    .bind(jukebox_common::time::now())
    .fetch_one(db)
    .await?;

    Ok(id)
}

/// Unanswered commands for a player, oldest first
pub async fn pending_commands(db: &Pool<Sqlite>, player_id: &str) -> Result<Vec<PendingCommand>> {
    let rows = sqlx::query(
        "SELECT id, command, argument FROM player_commands WHERE player_id = ? AND status IS NULL ORDER BY id",
    )
    .bind(player_id)
    .fetch_all(db)
    .await?;

    Ok(rows
        .iter()
        .map(|row| PendingCommand {
            id: row.get("id"),
            command: row.get("command"),
            argument: row.get("argument"),
        })
        .collect())
}

/// Record the outcome of a command
pub async fn complete_command(
    db: &Pool<Sqlite>,
    id: i64,
    status: &str,
    detail: Option<&str>,
) -> Result<()> {
    sqlx::query("UPDATE player_commands SET status = ?, detail = ? WHERE id = ?")
        .bind(status)
        .bind(detail)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

/// Outcome of a command, or `None` while it is still pending
pub async fn command_result(db: &Pool<Sqlite>, id: i64) -> Result<Option<CommandResult>> {
    let row = sqlx::query("SELECT status, detail FROM player_commands WHERE id = ? AND status IS NOT NULL")
        .bind(id)
        .fetch_optional(db)
        .await?;

    Ok(row.map(|row| CommandResult {
        status: row.get("status"),
        detail: row.get("detail"),
    }))
}

/// Delete a single command row
pub async fn delete_command(db: &Pool<Sqlite>, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM player_commands WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

/// Delete every command queued for a player
pub async fn delete_commands(db: &Pool<Sqlite>, player_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM player_commands WHERE player_id = ?")
        .bind(player_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}
