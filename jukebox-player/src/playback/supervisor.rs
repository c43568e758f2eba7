//! Player supervisor
//!
//! One control loop per `player_id`. The loop owns the child process for
//! the current song and is the only place that ends a [`PlaybackSession`]:
//! control requests only record an intent and ask the child to quit, and
//! the session ends after the child has actually been reaped.
//!
//! States: `Stopped -> Starting -> Playing <-> Paused -> Stopping -> Stopped`,
//! with `Crashed -> Starting` after an unexpected exit.

use crate::config::PlayerConfig;
use crate::db::{commands, runtime, songs};
use crate::error::{Error, Result};
use crate::hooks::HookRegistry;
use crate::playback::control::{dispatch_remote_command, ControlRequest, PauseOutcome, SupervisorHandle, STATUS_OK};
use crate::playback::crash_tracker::CrashTracker;
use crate::playback::process::{CommandChannel, PlayerProcess};
use crate::playback::session::PlaybackSession;
use crate::playback::PlayerContext;
use crate::queue::{load_fair_queue, QueueSlot};
use jukebox_common::db::{PlayerRuntimeState, Song};
use jukebox_common::events::{EndReason, EventBus, JukeboxEvent, SupervisorState};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{Pid, ProcessStatus, System};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const CONTROL_CHANNEL_CAPACITY: usize = 32;
const POLLER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
/// Slack on top of poll interval and stop timeout when waiting for a
/// previous owner to release the runtime row
const TAKEOVER_MARGIN: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopControl {
    Continue,
    Exit,
}

struct NextSong {
    song: Song,
    voters: Vec<String>,
}

/// How the current song is being ended
#[derive(Debug, Default)]
struct EndIntent {
    /// First requested reason; later requests never replace it
    reason: Option<EndReason>,
    stop_requested: bool,
    kill_deadline: Option<Instant>,
    /// Killed because it kept running after closing its event stream
    killed_after_close: bool,
}

impl EndIntent {
    fn kill_by(&mut self, deadline: Instant) {
        self.kill_deadline = Some(self.kill_deadline.map_or(deadline, |d| d.min(deadline)));
    }

    fn classify(&self, status: ExitStatus) -> EndReason {
        if let Some(reason) = self.reason {
            return reason;
        }
        if status.success() || self.killed_after_close {
            EndReason::Complete
        } else {
            EndReason::Crash
        }
    }
}

/// Owns the playback child process for one player
pub struct PlayerSupervisor {
    ctx: Arc<PlayerContext>,
    config: PlayerConfig,
    handle: SupervisorHandle,
    control_rx: mpsc::Receiver<ControlRequest>,
    state_tx: watch::Sender<SupervisorState>,
    crashes: CrashTracker,
    volume: u32,
}

impl PlayerSupervisor {
    pub fn new(
        db: Pool<Sqlite>,
        player_id: impl Into<String>,
        config: PlayerConfig,
        hooks: Arc<HookRegistry>,
        events: Arc<EventBus>,
    ) -> (Self, SupervisorHandle) {
        let player_id = player_id.into();
        let (tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(SupervisorState::Stopped);
        let handle = SupervisorHandle::new(player_id.clone(), tx, state_rx);

        let ctx = Arc::new(PlayerContext {
            db,
            hooks,
            events,
            player_id,
            instance_id: Uuid::new_v4(),
        });
        let crashes = CrashTracker::new(config.crash_threshold, config.crash_window());
        let volume = config.default_volume;

        let supervisor = Self {
            ctx,
            config,
            handle: handle.clone(),
            control_rx,
            state_tx,
            crashes,
            volume,
        };
        (supervisor, handle)
    }

    pub fn instance_id(&self) -> Uuid {
        self.ctx.instance_id
    }

    /// Register, then play songs until stopped, invalidated or crash-looping.
    ///
    /// The runtime row is removed on every exit path that gets past
    /// registration, unless another instance has taken it over.
    pub async fn run(mut self) -> Result<()> {
        self.config.validate()?;
        self.register().await?;
        self.set_state(SupervisorState::Starting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let poller = self.spawn_command_poller(shutdown_rx);

        let result = self.control_loop().await;

        self.set_state(SupervisorState::Stopping);
        self.reject_pending_requests();
        let _ = shutdown_tx.send(true);
        let poller_abort = poller.abort_handle();
        if tokio::time::timeout(POLLER_SHUTDOWN_TIMEOUT, poller).await.is_err() {
            warn!("Command poller for {} did not finish, aborting", self.ctx.player_id);
            poller_abort.abort();
        }

        match runtime::delete_owned_runtime_state(&self.ctx.db, &self.ctx.player_id, self.ctx.instance_id)
            .await
        {
            Ok(true) => debug!("Removed runtime state for {}", self.ctx.player_id),
            Ok(false) => info!(
                "Runtime state for {} no longer belongs to this instance",
                self.ctx.player_id
            ),
            Err(e) => warn!("Failed to remove runtime state for {}: {}", self.ctx.player_id, e),
        }
        self.set_state(SupervisorState::Stopped);

        match &result {
            Ok(()) => info!("Supervisor for {} stopped", self.ctx.player_id),
            Err(e) => error!("Supervisor for {} failed: {}", self.ctx.player_id, e),
        }
        result
    }

    /// Claim the runtime row, after any previous owner has let go of it
    async fn register(&mut self) -> Result<()> {
        if let Some(previous) = runtime::get_player_runtime_state(&self.ctx.db, &self.ctx.player_id).await? {
            self.take_over(&previous).await?;
        }

        let ctx = &self.ctx;
        let dropped = commands::delete_commands(&ctx.db, &ctx.player_id).await?;
        if dropped > 0 {
            debug!("Dropped {} stale commands for {}", dropped, ctx.player_id);
        }

        runtime::upsert_player_runtime_state(&ctx.db, &PlayerRuntimeState {
            player_id: ctx.player_id.clone(),
            instance_id: ctx.instance_id,
            local_process_id: std::process::id(),
            volume: self.volume,
            current_song_id: None,
            song_start_time: None,
            started_at: jukebox_common::time::now(),
            superseded: false,
        })
        .await?;

        info!(
            "Supervisor {} registered for {} (pid {})",
            ctx.instance_id,
            ctx.player_id,
            std::process::id()
        );
        Ok(())
    }

    /// Get the previous owner of `player_id` out of the way.
    ///
    /// A row left by a dead process is dropped at once. A live owner is
    /// marked superseded and has until its next poll plus `stop_timeout` to
    /// reap its child and delete the row. No child is spawned before that.
    async fn take_over(&self, previous: &PlayerRuntimeState) -> Result<()> {
        let ctx = &self.ctx;
        if !process_alive(previous.local_process_id) {
            warn!(
                "Replacing runtime state for {} left by dead pid {} (instance {})",
                ctx.player_id, previous.local_process_id, previous.instance_id
            );
            runtime::delete_owned_runtime_state(&ctx.db, &ctx.player_id, previous.instance_id).await?;
            return Ok(());
        }

        info!(
            "Asking instance {} (pid {}) to release {}",
            previous.instance_id, previous.local_process_id, ctx.player_id
        );
        runtime::mark_superseded(&ctx.db, &ctx.player_id, previous.instance_id).await?;

        let poll = self.config.command_poll_interval();
        let deadline = Instant::now() + poll + self.config.stop_timeout() + TAKEOVER_MARGIN;
        while Instant::now() < deadline {
            tokio::time::sleep(poll).await;
            match runtime::get_player_runtime_state(&ctx.db, &ctx.player_id).await? {
                Some(state) if state.instance_id == previous.instance_id => {}
                _ => {
                    info!("Instance {} released {}", previous.instance_id, ctx.player_id);
                    return Ok(());
                }
            }
        }

        if process_alive(previous.local_process_id) {
            return Err(Error::Internal(format!(
                "{} is still held by instance {} (pid {}); zap it if that supervisor is stuck",
                ctx.player_id, previous.instance_id, previous.local_process_id
            )));
        }
        warn!(
            "Instance {} exited without releasing {}, replacing its runtime state",
            previous.instance_id, ctx.player_id
        );
        runtime::delete_owned_runtime_state(&ctx.db, &ctx.player_id, previous.instance_id).await?;
        Ok(())
    }

    /// Answer requests still queued after the loop ended and refuse new ones
    fn reject_pending_requests(&mut self) {
        self.control_rx.close();
        while let Ok(request) = self.control_rx.try_recv() {
            match request {
                ControlRequest::Stop { reply } => {
                    let _ = reply.send(Ok(()));
                }
                ControlRequest::Skip { reply } => {
                    let _ = reply.send(Err(self.nothing_playing()));
                }
                ControlRequest::Pause { reply } => {
                    let _ = reply.send(Err(self.nothing_playing()));
                }
                ControlRequest::Volume { reply, .. } => {
                    let _ = reply.send(Err(self.nothing_playing()));
                }
                ControlRequest::Invalidate => {}
            }
        }
    }

    /// Forward `player_commands` rows into the control channel and watch for
    /// loss of the runtime row
    fn spawn_command_poller(&self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let ctx = Arc::clone(&self.ctx);
        let handle = self.handle.clone();
        let interval = self.config.command_poll_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => return,
                    _ = ticker.tick() => {}
                }

                match runtime::get_player_runtime_state(&ctx.db, &ctx.player_id).await {
                    Ok(Some(state)) if state.instance_id == ctx.instance_id && !state.superseded => {}
                    Ok(Some(state)) if state.instance_id == ctx.instance_id => {
                        info!("{} is wanted by a newer supervisor, releasing it", ctx.player_id);
                        handle.invalidate().await;
                        return;
                    }
                    Ok(Some(state)) => {
                        warn!(
                            "{} was taken over by instance {} (pid {})",
                            ctx.player_id, state.instance_id, state.local_process_id
                        );
                        handle.invalidate().await;
                        return;
                    }
                    Ok(None) => {
                        warn!("Runtime state for {} was removed", ctx.player_id);
                        handle.invalidate().await;
                        return;
                    }
                    Err(e) => {
                        warn!("Failed to check runtime state for {}: {}", ctx.player_id, e);
                        continue;
                    }
                }

                let pending = match commands::pending_commands(&ctx.db, &ctx.player_id).await {
                    Ok(pending) => pending,
                    Err(e) => {
                        warn!("Failed to read commands for {}: {}", ctx.player_id, e);
                        continue;
                    }
                };

                for command in pending {
                    let (status, detail) = match dispatch_remote_command(&handle, &command).await {
                        Ok(detail) => (STATUS_OK, detail),
                        Err(e) => (e.code(), Some(e.detail())),
                    };
                    if let Err(e) =
                        commands::complete_command(&ctx.db, command.id, status, detail.as_deref()).await
                    {
                        warn!("Failed to answer command {}: {}", command.id, e);
                    }
                }
            }
        })
    }

    async fn control_loop(&mut self) -> Result<()> {
        loop {
            self.set_state(SupervisorState::Starting);

            let next = match self.pick_next_song().await {
                Ok(next) => next,
                Err(e @ (Error::ResourceUnreachable(_) | Error::Database(_))) => {
                    warn!(
                        "Nothing to play on {}: {}; retrying in {:?}",
                        self.ctx.player_id,
                        e,
                        self.config.idle_retry()
                    );
                    if self.idle(self.config.idle_retry()).await == LoopControl::Exit {
                        return Ok(());
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };

            // Requests that arrived between songs
            if self.idle(Duration::ZERO).await == LoopControl::Exit {
                return Ok(());
            }

            if self.play(next).await? == LoopControl::Exit {
                return Ok(());
            }
        }
    }

    /// Head of the fair queue, skipping unreachable candidates, then a
    /// random online song.
    async fn pick_next_song(&self) -> Result<NextSong> {
        let queue = load_fair_queue(&self.ctx.db, &self.ctx.player_id).await?;

        for slot in &queue.slots {
            let QueueSlot::Voted(entry) = slot else {
                continue;
            };
            match self.confirm_reachable(&entry.song).await {
                Ok(song) => {
                    return Ok(NextSong {
                        song,
                        voters: entry.contributing_voters.iter().cloned().collect(),
                    })
                }
                Err(detail) => self.skip_candidate(&entry.song, detail).await,
            }
        }

        self.restore_offline_songs().await;
        let mut excluded = Vec::new();
        for _ in 0..self.config.random_pick_attempts.max(1) {
            let Some(song) = songs::find_playable_song(&self.ctx.db, &excluded).await? else {
                break;
            };
            match check_reachable(&song) {
                Ok(()) => {
                    debug!("Random pick for {}: {}", self.ctx.player_id, song.display_name());
                    return Ok(NextSong {
                        song,
                        voters: Vec::new(),
                    });
                }
                Err(detail) => {
                    self.skip_candidate(&song, detail).await;
                    excluded.push(song.song_id);
                }
            }
        }

        Err(Error::ResourceUnreachable(format!(
            "no reachable song for {}",
            self.ctx.player_id
        )))
    }

    /// Re-check a candidate's resource, bringing it back online if it
    /// became reachable again
    async fn confirm_reachable(&self, song: &Song) -> std::result::Result<Song, String> {
        check_reachable(song)?;
        let mut song = song.clone();
        if !song.online {
            info!("Song {} ({}) is reachable again", song.song_id, song.path);
            if let Err(e) = songs::set_song_online(&self.ctx.db, song.song_id, true).await {
                warn!("Failed to mark song {} online: {}", song.song_id, e);
            }
            song.online = true;
        }
        Ok(song)
    }

    /// Return offline songs whose files are back to the random pool
    async fn restore_offline_songs(&self) {
        let offline = match songs::list_offline_songs(&self.ctx.db).await {
            Ok(offline) => offline,
            Err(e) => {
                warn!("Failed to list offline songs: {}", e);
                return;
            }
        };
        for song in offline.iter().filter(|song| check_reachable(song).is_ok()) {
            let _ = self.confirm_reachable(song).await;
        }
    }

    async fn skip_candidate(&self, song: &Song, detail: String) {
        warn!("Skipping song {} ({}): {}", song.song_id, song.path, detail);
        if song.online {
            if let Err(e) = songs::set_song_online(&self.ctx.db, song.song_id, false).await {
                warn!("Failed to mark song {} offline: {}", song.song_id, e);
            }
        }
        self.ctx.events.emit_lossy(JukeboxEvent::CandidateSkipped {
            player_id: self.ctx.player_id.clone(),
            song_id: song.song_id,
            detail,
            timestamp: jukebox_common::time::now(),
        });
    }

    /// Answer control requests with no child running, for up to `duration`
    async fn idle(&mut self, duration: Duration) -> LoopControl {
        let deadline = Instant::now() + duration;
        loop {
            tokio::select! {
                biased;
                Some(request) = self.control_rx.recv() => {
                    if self.handle_idle_request(request).await == LoopControl::Exit {
                        return LoopControl::Exit;
                    }
                }
                _ = sleep_until(deadline) => return LoopControl::Continue,
            }
        }
    }

    async fn handle_idle_request(&mut self, request: ControlRequest) -> LoopControl {
        match request {
            ControlRequest::Skip { reply } => {
                let _ = reply.send(Err(self.nothing_playing()));
            }
            ControlRequest::Pause { reply } => {
                let _ = reply.send(Err(self.nothing_playing()));
            }
            ControlRequest::Volume { volume, reply } => {
                let _ = reply.send(self.apply_volume(volume, None).await);
            }
            ControlRequest::Stop { reply } => {
                info!("Stop requested for idle player {}", self.ctx.player_id);
                let _ = reply.send(Ok(()));
                return LoopControl::Exit;
            }
            ControlRequest::Invalidate => {
                warn!("Supervisor for {} invalidated while idle", self.ctx.player_id);
                return LoopControl::Exit;
            }
        }
        LoopControl::Continue
    }

    /// Play one song to its end
    async fn play(&mut self, next: NextSong) -> Result<LoopControl> {
        let NextSong { song, voters } = next;

        let mut process = match PlayerProcess::spawn(&self.config, &song.path) {
            Ok(process) => process,
            Err(e) => {
                warn!("Could not start player for {}: {}", song.path, e);
                self.set_state(SupervisorState::Crashed);
                self.crashes.record_crash(Instant::now())?;
                return Ok(LoopControl::Continue);
            }
        };

        if let Err(e) = process.commands.send(&self.config.volume_line(self.volume)).await {
            debug!("Initial volume not delivered: {}", e);
        }

        let session = PlaybackSession::start(Arc::clone(&self.ctx), song, voters, process.id()).await;
        self.set_state(SupervisorState::Playing);

        let mut intent = EndIntent::default();
        let status = loop {
            tokio::select! {
                status = process.child.wait() => break status,
                line = process.events.next_line(), if !process.events.is_closed() => match line {
                    Some(line) => debug!("{} player: {}", self.ctx.player_id, line),
                    None => {
                        debug!("Event channel closed for song {}", session.song().song_id);
                        intent.kill_by(Instant::now() + self.config.stop_timeout());
                    }
                },
                Some(request) = self.control_rx.recv() => {
                    self.handle_playing_request(request, &mut process, &mut intent).await;
                }
                _ = sleep_until(intent.kill_deadline.unwrap_or_else(Instant::now)), if intent.kill_deadline.is_some() => {
                    warn!(
                        "Player for song {} still running after {:?}, killing it",
                        session.song().song_id,
                        self.config.stop_timeout()
                    );
                    intent.killed_after_close = intent.reason.is_none();
                    intent.kill_deadline = None;
                    if let Err(e) = process.child.start_kill() {
                        debug!("start_kill failed: {}", e);
                    }
                }
            }
        };

        let reason = match status {
            Ok(status) => {
                debug!("Player for song {} exited with {}", session.song().song_id, status);
                intent.classify(status)
            }
            Err(e) => {
                warn!("Failed waiting on player for song {}: {}", session.song().song_id, e);
                if let Err(e) = process.kill().await {
                    warn!("Failed to reap player: {}", e);
                }
                intent.reason.unwrap_or(EndReason::Crash)
            }
        };
        drop(process);

        if reason == EndReason::Crash {
            self.set_state(SupervisorState::Crashed);
        }
        let summary = session.end(reason).await;
        debug!(
            "Song {} played {}s, {} votes cleared",
            summary.song.song_id,
            (summary.ended_at - summary.started_at).num_seconds(),
            summary.votes_cleared
        );

        if intent.stop_requested {
            return Ok(LoopControl::Exit);
        }

        if reason == EndReason::Crash {
            if let Err(e) = self.crashes.record_crash(Instant::now()) {
                error!("Player for {} keeps crashing: {}", self.ctx.player_id, e);
                return Err(e);
            }
            warn!(
                "Player for {} crashed ({} of {} allowed in window)",
                self.ctx.player_id,
                self.crashes.consecutive_crashes(),
                self.config.crash_threshold
            );
        } else {
            self.crashes.record_success();
        }
        Ok(LoopControl::Continue)
    }

    async fn handle_playing_request(
        &mut self,
        request: ControlRequest,
        process: &mut PlayerProcess,
        intent: &mut EndIntent,
    ) {
        match request {
            ControlRequest::Skip { reply } => {
                let result = self.request_end(EndReason::Skip, process, intent).await;
                let _ = reply.send(result);
            }
            ControlRequest::Stop { reply } => {
                intent.stop_requested = true;
                let result = match self.request_end(EndReason::Stop, process, intent).await {
                    // Exited on its own; nothing left to signal
                    Err(Error::SignalDelivery(detail)) => {
                        debug!("Stop found player already gone: {}", detail);
                        Ok(())
                    }
                    other => other,
                };
                self.set_state(SupervisorState::Stopping);
                let _ = reply.send(result);
            }
            ControlRequest::Invalidate => {
                warn!("Supervisor for {} invalidated, stopping playback", self.ctx.player_id);
                intent.stop_requested = true;
                if let Err(e) = self.request_end(EndReason::Stop, process, intent).await {
                    debug!("Invalidation stop: {}", e);
                }
                self.set_state(SupervisorState::Stopping);
            }
            ControlRequest::Pause { reply } => {
                let result = self.toggle_pause(process, intent).await;
                let _ = reply.send(result);
            }
            ControlRequest::Volume { volume, reply } => {
                let result = self.apply_volume(volume, Some(&mut process.commands)).await;
                let _ = reply.send(result);
            }
        }
    }

    /// Ask the child to quit and remember why.
    ///
    /// Fails with `SignalDelivery` when the child is already gone; a child
    /// that is alive but not reading gets killed.
    async fn request_end(
        &self,
        reason: EndReason,
        process: &mut PlayerProcess,
        intent: &mut EndIntent,
    ) -> Result<()> {
        if let Some(pending) = intent.reason {
            debug!("Song already ending ({}), ignoring {}", pending, reason);
            return Ok(());
        }

        match process.commands.send(&self.config.quit_command).await {
            Ok(()) => {}
            Err(e) if process.has_exited() => return Err(e),
            Err(e) => {
                warn!("{}; killing player instead", e);
                if let Err(e) = process.child.start_kill() {
                    debug!("start_kill failed: {}", e);
                }
            }
        }

        info!("Ending current song on {}: {}", self.ctx.player_id, reason);
        intent.reason = Some(reason);
        intent.kill_by(Instant::now() + self.config.stop_timeout());
        Ok(())
    }

    async fn toggle_pause(&self, process: &mut PlayerProcess, intent: &EndIntent) -> Result<PauseOutcome> {
        if !self.config.supports_pause {
            debug!("Backend for {} cannot pause", self.ctx.player_id);
            return Ok(PauseOutcome::Unsupported);
        }
        if intent.reason.is_some() || !self.state_tx.borrow().has_child() {
            return Err(Error::ProcessNotRunning(format!(
                "song on {} is already ending",
                self.ctx.player_id
            )));
        }

        process.commands.send(&self.config.pause_command).await?;

        let (next, outcome) = match *self.state_tx.borrow() {
            SupervisorState::Paused => (SupervisorState::Playing, PauseOutcome::Resumed),
            _ => (SupervisorState::Paused, PauseOutcome::Paused),
        };
        self.set_state(next);
        Ok(outcome)
    }

    /// Persist a new volume and pass it to the child if one is running
    async fn apply_volume(&mut self, volume: u32, channel: Option<&mut CommandChannel>) -> Result<()> {
        runtime::set_volume(&self.ctx.db, &self.ctx.player_id, self.ctx.instance_id, volume).await?;
        self.volume = volume;
        info!("Volume for {} set to {}", self.ctx.player_id, volume);
        self.ctx.events.emit_lossy(JukeboxEvent::VolumeChanged {
            player_id: self.ctx.player_id.clone(),
            volume,
            timestamp: jukebox_common::time::now(),
        });

        if let Some(channel) = channel {
            channel.send(&self.config.volume_line(volume)).await?;
        }
        Ok(())
    }

    fn set_state(&self, new_state: SupervisorState) {
        let old_state = self.state_tx.send_replace(new_state);
        if old_state == new_state {
            return;
        }
        debug!("{}: {} -> {}", self.ctx.player_id, old_state, new_state);
        self.ctx.events.emit_lossy(JukeboxEvent::SupervisorStateChanged {
            player_id: self.ctx.player_id.clone(),
            old_state,
            new_state,
            timestamp: jukebox_common::time::now(),
        });
    }

    fn nothing_playing(&self) -> Error {
        Error::ProcessNotRunning(format!("no song playing on {}", self.ctx.player_id))
    }
}

/// Whether a song's resource can be handed to the backend.
///
/// Local files are checked on disk every time, whatever the stored
/// `online` flag says. Paths with a URL scheme cannot be probed and follow
/// the flag.
fn check_reachable(song: &Song) -> std::result::Result<(), String> {
    if song.path.contains("://") {
        return if song.online {
            Ok(())
        } else {
            Err("song is offline".to_string())
        };
    }
    if !Path::new(&song.path).exists() {
        return Err(format!("{} does not exist", song.path));
    }
    Ok(())
}

/// Whether `pid` is a running (not zombie) process on this host
fn process_alive(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    if !system.refresh_process(pid) {
        return false;
    }
    system
        .process(pid)
        .is_some_and(|process| process.status() != ProcessStatus::Zombie)
}
