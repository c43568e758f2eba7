//! Voter-fair playback order
//!
//! Turns the current vote set into a play order by round-robin across
//! voters: each voter in turn contributes their lowest-priority song that is
//! not already queued, then goes to the back of the rotation. Voters with
//! nothing left drop out of this round but stay in the persisted order.

use jukebox_common::db::{Song, SongId, Vote};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Persistent round-robin turn order across voters.
///
/// Voters are only ever appended; a voter with no pending votes keeps their
/// place so they regain their turn when they vote again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoterOrder(Vec<String>);

impl VoterOrder {
    pub fn new(voters: Vec<String>) -> Self {
        Self(voters)
    }

    pub fn voters(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, voter_id: &str) -> bool {
        self.0.iter().any(|v| v == voter_id)
    }

    /// Append a voter if not already present
    pub fn append(&mut self, voter_id: &str) {
        if !self.contains(voter_id) {
            self.0.push(voter_id.to_string());
        }
    }
}

impl From<Vec<String>> for VoterOrder {
    fn from(voters: Vec<String>) -> Self {
        Self(voters)
    }
}

/// A queued song with its aggregated voter support
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEntry {
    pub song: Song,
    /// Everyone with an active vote for this song
    pub contributing_voters: BTreeSet<String>,
    /// Priority of the vote that earned this slot, within its voter's list
    pub priority: i64,
}

/// One position in the play order
#[derive(Debug, Clone, PartialEq)]
pub enum QueueSlot {
    /// A song someone voted for
    Voted(PlaylistEntry),
    /// No votes at all: the caller picks any online song at random
    AnyOnlineSong,
}

/// Builder output: the play order and the voter order to persist
#[derive(Debug, Clone, PartialEq)]
pub struct FairQueue {
    pub slots: Vec<QueueSlot>,
    pub voter_order: VoterOrder,
}

impl FairQueue {
    /// Voted entries in play order (empty when only the fallback slot exists)
    pub fn entries(&self) -> impl Iterator<Item = &PlaylistEntry> {
        self.slots.iter().filter_map(|slot| match slot {
            QueueSlot::Voted(entry) => Some(entry),
            QueueSlot::AnyOnlineSong => None,
        })
    }

    pub fn song_ids(&self) -> Vec<SongId> {
        self.entries().map(|entry| entry.song.song_id).collect()
    }
}

/// Build the fair play order.
///
/// `votes` should be in the order they were cast: voters missing from
/// `voter_order` are appended in the order of their first vote. Votes for
/// songs absent from `songs` are ignored.
pub fn build_fair_queue(
    votes: &[Vote],
    songs: &HashMap<SongId, Song>,
    voter_order: &VoterOrder,
) -> FairQueue {
    let mut order = voter_order.clone();
    let mut supporters: HashMap<SongId, BTreeSet<String>> = HashMap::new();
    let mut pending: HashMap<&str, Vec<(i64, SongId)>> = HashMap::new();

    for vote in votes {
        if !songs.contains_key(&vote.song_id) {
            tracing::debug!(
                "Ignoring vote by {} for unknown song {}",
                vote.voter_id,
                vote.song_id
            );
            continue;
        }
        order.append(&vote.voter_id);
        supporters
            .entry(vote.song_id)
            .or_default()
            .insert(vote.voter_id.clone());
        pending
            .entry(vote.voter_id.as_str())
            .or_default()
            .push((vote.priority, vote.song_id));
    }

    let mut pending: HashMap<&str, VecDeque<(i64, SongId)>> = pending
        .into_iter()
        .map(|(voter, mut list)| {
            list.sort_unstable();
            (voter, VecDeque::from(list))
        })
        .collect();

    let mut rotation: VecDeque<&str> = order.voters().iter().map(String::as_str).collect();
    let mut assigned: HashSet<SongId> = HashSet::new();
    let mut slots = Vec::with_capacity(supporters.len());

    while let Some(voter) = rotation.pop_front() {
        let Some(list) = pending.get_mut(voter) else {
            continue;
        };

        let mut next = None;
        while let Some((priority, song_id)) = list.pop_front() {
            if assigned.insert(song_id) {
                next = Some((priority, song_id));
                break;
            }
        }

        if let Some((priority, song_id)) = next {
            slots.push(QueueSlot::Voted(PlaylistEntry {
                song: songs[&song_id].clone(),
                contributing_voters: supporters.remove(&song_id).unwrap_or_default(),
                priority,
            }));
            rotation.push_back(voter);
        }
    }

    if slots.is_empty() {
        slots.push(QueueSlot::AnyOnlineSong);
    }

    FairQueue {
        slots,
        voter_order: order,
    }
}
