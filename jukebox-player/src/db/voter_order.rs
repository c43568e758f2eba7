//! Persisted round-robin voter order

use crate::error::Result;
use sqlx::{Pool, Sqlite};

/// Load the voter order for a player, front of the rotation first
pub async fn load_voter_order(db: &Pool<Sqlite>, player_id: &str) -> Result<Vec<String>> {
    let voters = sqlx::query_scalar(
        "SELECT voter_id FROM voter_order WHERE player_id = ? ORDER BY position",
    )
    .bind(player_id)
    .fetch_all(db)
    .await?;

    Ok(voters)
}

/// Replace the stored voter order for a player
pub async fn save_voter_order(db: &Pool<Sqlite>, player_id: &str, voters: &[String]) -> Result<()> {
    let mut tx = db.begin().await?;

    sqlx::query("DELETE FROM voter_order WHERE player_id = ?")
        .bind(player_id)
        .execute(&mut *tx)
        .await?;

    for (position, voter_id) in voters.iter().enumerate() {
        sqlx::query("INSERT INTO voter_order (player_id, voter_id, position) VALUES (?, ?, ?)")
            .bind(player_id)
            .bind(voter_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Move `voters` to the back of the order, keeping relative order on both
/// sides. Voters not yet in the order are appended.
pub async fn rotate_voters_to_back(
    db: &Pool<Sqlite>,
    player_id: &str,
    voters: &[String],
) -> Result<()> {
    if voters.is_empty() {
        return Ok(());
    }

    let current = load_voter_order(db, player_id).await?;
    let rotated = rotate(&current, voters);
    save_voter_order(db, player_id, &rotated).await
}

fn rotate(current: &[String], to_back: &[String]) -> Vec<String> {
    let mut rotated: Vec<String> = current
        .iter()
        .filter(|voter| !to_back.contains(voter))
        .cloned()
        .collect();
    rotated.extend(current.iter().filter(|voter| to_back.contains(voter)).cloned());
    for voter in to_back {
        if !rotated.contains(voter) {
            rotated.push(voter.clone());
        }
    }
    rotated
}
