//! External playback process
//!
//! The backend is spawned with the song path as its last argument. Its
//! stdin is the command channel (one command per line) and its stdout the
//! event channel: any line means "still running", closure means "ended".

use crate::config::PlayerConfig;
use crate::error::{Error, Result};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::debug;

/// Write side of the child's stdin
pub struct CommandChannel {
    stdin: Option<ChildStdin>,
}

impl CommandChannel {
    /// Send one command line to the player
    pub async fn send(&mut self, line: &str) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Error::SignalDelivery("command channel closed".to_string()))?;

        let delivered = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        }
        .await;

        if let Err(e) = delivered {
            // A broken pipe means the reader is gone for good
            self.stdin = None;
            return Err(Error::SignalDelivery(format!("{}: {}", line, e)));
        }

        Ok(())
    }

    /// Close stdin so the player sees end-of-input
    pub fn close(&mut self) {
        self.stdin = None;
    }
}

/// Read side of the child's stdout
pub struct EventChannel {
    lines: Option<Lines<BufReader<ChildStdout>>>,
}

impl EventChannel {
    /// Next output line, or `None` once the stream has closed.
    ///
    /// After closure this never resolves, so it can sit in a `select!`
    /// guarded by [`EventChannel::is_closed`].
    pub async fn next_line(&mut self) -> Option<String> {
        let Some(lines) = self.lines.as_mut() else {
            return std::future::pending().await;
        };

        match lines.next_line().await {
            Ok(Some(line)) => Some(line),
            Ok(None) => {
                self.lines = None;
                None
            }
            Err(e) => {
                debug!("Event channel read failed: {}", e);
                self.lines = None;
                None
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lines.is_none()
    }
}

/// A running player process.
///
/// Fields are public so a control loop can wait on the child while reading
/// events and sending commands.
pub struct PlayerProcess {
    pub child: Child,
    pub commands: CommandChannel,
    pub events: EventChannel,
}

impl PlayerProcess {
    /// Spawn the configured backend for `path`
    pub fn spawn(config: &PlayerConfig, path: &str) -> Result<Self> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", config.command, e))))?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();

        debug!("Spawned {} (pid {:?}) for {}", config.command, child.id(), path);

        Ok(Self {
            child,
            commands: CommandChannel { stdin },
            events: EventChannel {
                lines: stdout.map(|out| BufReader::new(out).lines()),
            },
        })
    }

    /// OS pid while the child has not been reaped
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Whether the child has already exited
    pub fn has_exited(&mut self) -> bool {
        !matches!(self.child.try_wait(), Ok(None))
    }

    /// Kill the child and reap it
    pub async fn kill(&mut self) -> std::io::Result<ExitStatus> {
        self.commands.close();
        if let Err(e) = self.child.start_kill() {
            // Already exited: just reap
            debug!("start_kill failed: {}", e);
        }
        self.child.wait().await
    }
}
