//! One playback attempt for one song
//!
//! `start` and `end` carry the bookkeeping for each transition. `end`
//! consumes the session, so a started song is ended exactly once. Storage
//! and hook failures are logged and swallowed: a missed history write must
//! not stop the next song.

use crate::db::{history, runtime, voter_order, votes};
use crate::hooks::{HookParams, PLAYER_COMPONENT, SONG_START_EVENT, SONG_STOP_EVENT};
use crate::playback::PlayerContext;
use chrono::{DateTime, Utc};
use jukebox_common::db::Song;
use jukebox_common::events::{EndReason, JukeboxEvent};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to a finished session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub song: Song,
    pub reason: EndReason,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Votes removed because the song counted as played
    pub votes_cleared: u64,
}

/// A started song that has not ended yet
#[must_use = "a started session must be ended"]
pub struct PlaybackSession {
    ctx: Arc<PlayerContext>,
    song: Song,
    voters: Vec<String>,
    started_at: DateTime<Utc>,
}

impl PlaybackSession {
    /// Record the start of `song`.
    ///
    /// `voters` are the voters whose queue slot selected the song (empty for
    /// a random pick); they are rotated to the back of the turn order if the
    /// song ends up played.
    pub async fn start(
        ctx: Arc<PlayerContext>,
        song: Song,
        voters: Vec<String>,
        process_id: Option<u32>,
    ) -> Self {
        let started_at = jukebox_common::time::now();
        let display_name = song.display_name();
        info!("Playing {} [{}] on {}", display_name, song.song_id, ctx.player_id);

        if let Err(e) = runtime::set_current_song(
            &ctx.db,
            &ctx.player_id,
            ctx.instance_id,
            Some((song.song_id, started_at)),
        )
        .await
        {
            warn!("Failed to record current song {}: {}", song.song_id, e);
        }

        let outcome = ctx
            .hooks
            .fire_event(PLAYER_COMPONENT, SONG_START_EVENT, &hook_params(&ctx, &song, None));
        debug!("song_start hooks returned {} values", outcome.values.len());

        ctx.events.emit_lossy(JukeboxEvent::SongStarted {
            player_id: ctx.player_id.clone(),
            song_id: song.song_id,
            display_name,
            process_id,
            timestamp: started_at,
        });

        Self {
            ctx,
            song,
            voters,
            started_at,
        }
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Finish the session.
    ///
    /// Complete and skip count as played: votes are cleared, history is
    /// appended and the supporting voters move to the back of the turn
    /// order. Stop and crash leave the votes so the song is retried.
    pub async fn end(self, reason: EndReason) -> SessionSummary {
        let ctx = &self.ctx;
        let song_id = self.song.song_id;
        let ended_at = jukebox_common::time::now();
        let mut votes_cleared = 0;

        if reason.counts_as_played() {
            let mut voters = self.voters.clone();
            match votes::voters_for_song(&ctx.db, &ctx.player_id, song_id).await {
                Ok(current) => {
                    for voter in current {
                        if !voters.contains(&voter) {
                            voters.push(voter);
                        }
                    }
                }
                Err(e) => warn!("Failed to read voters for song {}: {}", song_id, e),
            }

            match votes::clear_votes(&ctx.db, &ctx.player_id, song_id).await {
                Ok(cleared) => votes_cleared = cleared,
                Err(e) => warn!("Failed to clear votes for song {}: {}", song_id, e),
            }

            if let Err(e) =
                history::append_history(&ctx.db, song_id, "", ended_at, &self.song.display_name()).await
            {
                warn!("Failed to append history for song {}: {}", song_id, e);
            }

            if let Err(e) = voter_order::rotate_voters_to_back(&ctx.db, &ctx.player_id, &voters).await {
                warn!("Failed to rotate voter order for {}: {}", ctx.player_id, e);
            }
        }

        if let Err(e) = runtime::set_current_song(&ctx.db, &ctx.player_id, ctx.instance_id, None).await {
            warn!("Failed to clear current song for {}: {}", ctx.player_id, e);
        }

        ctx.hooks.fire_event(
            PLAYER_COMPONENT,
            SONG_STOP_EVENT,
            &hook_params(ctx, &self.song, Some(reason)),
        );

        ctx.events.emit_lossy(JukeboxEvent::SongEnded {
            player_id: ctx.player_id.clone(),
            song_id,
            reason,
            timestamp: ended_at,
        });

        info!("Song {} ended: {}", song_id, reason);

        SessionSummary {
            song: self.song,
            reason,
            started_at: self.started_at,
            ended_at,
            votes_cleared,
        }
    }
}

fn hook_params(ctx: &PlayerContext, song: &Song, reason: Option<EndReason>) -> HookParams {
    let mut params = HookParams::new();
    params.insert("player_id".to_string(), ctx.player_id.clone());
    params.insert("song_id".to_string(), song.song_id.to_string());
    params.insert("path".to_string(), song.path.clone());
    params.insert("display_name".to_string(), song.display_name());
    if let Some(reason) = reason {
        params.insert("reason".to_string(), reason.to_string());
    }
    params
}
