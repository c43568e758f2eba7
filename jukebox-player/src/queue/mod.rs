//! Fair queue construction

pub mod fair_queue;

pub use fair_queue::{build_fair_queue, FairQueue, PlaylistEntry, QueueSlot, VoterOrder};

use crate::db::{voter_order, votes};
use crate::error::Result;
use sqlx::{Pool, Sqlite};
use tracing::debug;

/// Build the current play order for a player from a fresh vote snapshot.
///
/// Newly discovered voters are persisted to the voter order so later
/// rebuilds keep their place.
pub async fn load_fair_queue(db: &Pool<Sqlite>, player_id: &str) -> Result<FairQueue> {
    let (votes, songs) = votes::load_vote_snapshot(db, player_id).await?;
    let stored = voter_order::load_voter_order(db, player_id).await?;
    let queue = build_fair_queue(&votes, &songs, &VoterOrder::from(stored.clone()));

    if queue.voter_order.voters() != stored.as_slice() {
        debug!(
            "Voter order for {} grew from {} to {} voters",
            player_id,
            stored.len(),
            queue.voter_order.voters().len()
        );
        voter_order::save_voter_order(db, player_id, queue.voter_order.voters()).await?;
    }

    Ok(queue)
}
