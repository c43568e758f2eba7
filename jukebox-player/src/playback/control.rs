//! Control surface
//!
//! Callers never touch the child process directly. In-process callers hold a
//! [`SupervisorHandle`] whose requests land in the control loop's channel;
//! other processes go through [`RemoteControl`], which queues rows in
//! `player_commands` for the supervisor's poller to forward into that same
//! channel.

use crate::db::{commands, runtime};
use crate::error::{Error, Result};
use jukebox_common::events::SupervisorState;
use sqlx::{Pool, Sqlite};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info};

pub const SKIP_COMMAND: &str = "skip";
pub const STOP_COMMAND: &str = "stop";
pub const PAUSE_COMMAND: &str = "pause";
pub const VOLUME_COMMAND: &str = "volume";

/// Status written for a command that succeeded
pub const STATUS_OK: &str = "ok";

/// A request delivered to the control loop
#[derive(Debug)]
pub enum ControlRequest {
    Skip { reply: oneshot::Sender<Result<()>> },
    Stop { reply: oneshot::Sender<Result<()>> },
    Pause { reply: oneshot::Sender<Result<PauseOutcome>> },
    Volume { volume: u32, reply: oneshot::Sender<Result<()>> },
    /// The runtime row was zapped or taken over: stop without replying
    Invalidate,
}

/// Result of a pause toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    Paused,
    Resumed,
    /// The backend has no pause command; nothing was sent
    Unsupported,
}

impl PauseOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PauseOutcome::Paused => "paused",
            PauseOutcome::Resumed => "resumed",
            PauseOutcome::Unsupported => "unsupported",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "paused" => Some(PauseOutcome::Paused),
            "resumed" => Some(PauseOutcome::Resumed),
            "unsupported" => Some(PauseOutcome::Unsupported),
            _ => None,
        }
    }
}

/// Parse a user-supplied volume: a non-negative integer
pub fn parse_volume(value: &str) -> Result<u32> {
    let trimmed = value.trim();
    let volume: i64 = trimmed
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("volume must be an integer, got {:?}", value)))?;
    volume_from_i64(volume)
}

fn volume_from_i64(volume: i64) -> Result<u32> {
    if volume < 0 {
        return Err(Error::InvalidArgument(format!(
            "volume must not be negative, got {}",
            volume
        )));
    }
    u32::try_from(volume).map_err(|_| Error::InvalidArgument(format!("volume {} is out of range", volume)))
}

/// In-process handle to a running supervisor
#[derive(Clone)]
pub struct SupervisorHandle {
    player_id: String,
    tx: mpsc::Sender<ControlRequest>,
    state: watch::Receiver<SupervisorState>,
}

impl SupervisorHandle {
    pub(crate) fn new(
        player_id: String,
        tx: mpsc::Sender<ControlRequest>,
        state: watch::Receiver<SupervisorState>,
    ) -> Self {
        Self { player_id, tx, state }
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// End the current song with reason `skip`
    pub async fn skip(&self) -> Result<()> {
        self.request(|reply| ControlRequest::Skip { reply }).await
    }

    /// End the current song with reason `stop` and shut the supervisor down.
    ///
    /// Returns once the request is accepted; use [`Self::wait_for_state`] to
    /// wait for `Stopped`.
    pub async fn stop(&self) -> Result<()> {
        self.request(|reply| ControlRequest::Stop { reply }).await
    }

    /// Toggle pause on the current song
    pub async fn pause(&self) -> Result<PauseOutcome> {
        self.request(|reply| ControlRequest::Pause { reply }).await
    }

    pub async fn set_volume(&self, volume: i64) -> Result<()> {
        let volume = volume_from_i64(volume)?;
        self.request(|reply| ControlRequest::Volume { volume, reply }).await
    }

    pub(crate) async fn invalidate(&self) {
        let _ = self.tx.send(ControlRequest::Invalidate).await;
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Wait until the supervisor state satisfies `accept`
    pub async fn wait_for_state<F>(&self, mut accept: F, timeout: Duration) -> Result<SupervisorState>
    where
        F: FnMut(SupervisorState) -> bool,
    {
        let mut rx = self.state.clone();
        let wait = async {
            loop {
                let current = *rx.borrow_and_update();
                if accept(current) {
                    return Ok(current);
                }
                if rx.changed().await.is_err() {
                    // Supervisor is gone; its last state is final
                    let last = *rx.borrow();
                    return if accept(last) { Ok(last) } else { Err(self.not_running()) };
                }
            }
        };

        tokio::time::timeout(timeout, wait).await.map_err(|_| {
            Error::Internal(format!(
                "timed out after {:?} waiting on {} (state {})",
                timeout,
                self.player_id,
                self.state()
            ))
        })?
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> ControlRequest,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx.send(build(reply)).await.map_err(|_| self.not_running())?;
        response.await.map_err(|_| self.not_running())?
    }

    fn not_running(&self) -> Error {
        Error::ProcessNotRunning(format!("supervisor for {} is not running", self.player_id))
    }
}

/// Forward one queued remote command through `handle`.
///
/// Returns the detail string written back on success.
pub(crate) async fn dispatch_remote_command(
    handle: &SupervisorHandle,
    command: &commands::PendingCommand,
) -> Result<Option<String>> {
    debug!("Remote command {} {:?} for {}", command.command, command.argument, handle.player_id());
    match command.command.as_str() {
        SKIP_COMMAND => handle.skip().await.map(|()| None),
        STOP_COMMAND => handle.stop().await.map(|()| None),
        PAUSE_COMMAND => handle
            .pause()
            .await
            .map(|outcome| Some(outcome.as_str().to_string())),
        VOLUME_COMMAND => {
            let argument = command
                .argument
                .as_deref()
                .ok_or_else(|| Error::InvalidArgument("volume needs a value".to_string()))?;
            let volume = parse_volume(argument)?;
            handle.set_volume(i64::from(volume)).await?;
            Ok(Some(volume.to_string()))
        }
        other => Err(Error::InvalidArgument(format!("unknown command {:?}", other))),
    }
}

/// Control a supervisor running in another process through the database
pub struct RemoteControl {
    db: Pool<Sqlite>,
    player_id: String,
    reply_timeout: Duration,
    poll_interval: Duration,
}

impl RemoteControl {
    pub fn new(db: Pool<Sqlite>, player_id: impl Into<String>) -> Self {
        Self {
            db,
            player_id: player_id.into(),
            reply_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(50),
        }
    }

    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    pub async fn skip(&self) -> Result<()> {
        self.send(SKIP_COMMAND, None).await.map(|_| ())
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(STOP_COMMAND, None).await.map(|_| ())
    }

    pub async fn pause(&self) -> Result<PauseOutcome> {
        let detail = self.send(PAUSE_COMMAND, None).await?;
        detail
            .as_deref()
            .and_then(PauseOutcome::parse)
            .ok_or_else(|| Error::Internal(format!("unexpected pause reply {:?}", detail)))
    }

    /// Validate and apply a volume typed by the user
    pub async fn set_volume(&self, value: &str) -> Result<u32> {
        let volume = parse_volume(value)?;
        self.send(VOLUME_COMMAND, Some(&volume.to_string())).await?;
        Ok(volume)
    }

    async fn send(&self, command: &str, argument: Option<&str>) -> Result<Option<String>> {
        if runtime::get_player_runtime_state(&self.db, &self.player_id)
            .await?
            .is_none()
        {
            return Err(Error::ProcessNotRunning(format!(
                "no supervisor registered for {}",
                self.player_id
            )));
        }

        let id = commands::enqueue_command(&self.db, &self.player_id, command, argument).await?;
        let deadline = Instant::now() + self.reply_timeout;

        loop {
            if let Some(result) = commands::command_result(&self.db, id).await? {
                commands::delete_command(&self.db, id).await?;
                if result.status == STATUS_OK {
                    return Ok(result.detail);
                }
                return Err(Error::from_code(&result.status, result.detail.unwrap_or_default()));
            }

            if Instant::now() >= deadline {
                commands::delete_command(&self.db, id).await?;
                return Err(Error::ProcessNotRunning(format!(
                    "{} did not answer {} within {:?}",
                    self.player_id, command, self.reply_timeout
                )));
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Force-clear a player's runtime state and queued commands.
///
/// A supervisor still running for `player_id` notices the missing row on its
/// next poll and stops. Returns true if a runtime row existed.
pub async fn zap(db: &Pool<Sqlite>, player_id: &str) -> Result<bool> {
    let existed = runtime::delete_player_runtime_state(db, player_id).await?;
    let dropped = commands::delete_commands(db, player_id).await?;
    info!(
        "Zapped {}: runtime state {}, {} queued commands dropped",
        player_id,
        if existed { "removed" } else { "absent" },
        dropped
    );
    Ok(existed)
}
