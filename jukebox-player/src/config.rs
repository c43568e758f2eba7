//! jukebox-player configuration
//!
//! Loaded from the TOML config file. Every field has a default so a missing
//! or partial file still yields a runnable player.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Top-level config file layout
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub player: PlayerConfig,
    pub hooks: Vec<HookConfig>,
}

/// Playback backend and supervision policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Backend executable
    pub command: String,
    /// Extra arguments; the song path is appended last
    pub args: Vec<String>,
    pub quit_command: String,
    pub pause_command: String,
    /// `{volume}` is replaced with the new volume
    pub volume_command: String,
    pub supports_pause: bool,
    /// Grace period after `quit` before the child is killed
    pub stop_timeout_ms: u64,
    /// Consecutive crashes that make the supervisor give up
    pub crash_threshold: usize,
    pub crash_window_secs: u64,
    /// How often the remote command table is polled
    pub command_poll_ms: u64,
    /// Wait between attempts when no song at all can be found
    pub idle_retry_ms: u64,
    pub default_volume: u32,
    /// Random picks tried before giving up on the empty-queue fallback
    pub random_pick_attempts: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: "mpg123".to_string(),
            args: vec!["-R".to_string()],
            quit_command: "quit".to_string(),
            pause_command: "pause".to_string(),
            volume_command: "volume {volume}".to_string(),
            supports_pause: true,
            stop_timeout_ms: 5000,
            crash_threshold: 5,
            crash_window_secs: 60,
            command_poll_ms: 250,
            idle_retry_ms: 5000,
            default_volume: 50,
            random_pick_attempts: 10,
        }
    }
}

impl PlayerConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn crash_window(&self) -> Duration {
        Duration::from_secs(self.crash_window_secs)
    }

    pub fn command_poll_interval(&self) -> Duration {
        Duration::from_millis(self.command_poll_ms.max(10))
    }

    pub fn idle_retry(&self) -> Duration {
        Duration::from_millis(self.idle_retry_ms)
    }

    /// Render the volume command line for the backend
    pub fn volume_line(&self, volume: u32) -> String {
        self.volume_command.replace("{volume}", &volume.to_string())
    }

    /// Reject settings the supervisor cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(Error::Config("player.command must not be empty".to_string()));
        }
        if self.crash_threshold == 0 {
            return Err(Error::Config("player.crash_threshold must be at least 1".to_string()));
        }
        if self.quit_command.trim().is_empty() {
            return Err(Error::Config("player.quit_command must not be empty".to_string()));
        }
        Ok(())
    }
}

/// One extension hook registration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HookConfig {
    pub component: String,
    pub event: String,
    #[serde(flatten)]
    pub kind: HookKind,
}

/// Built-in hook handler kinds
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum HookKind {
    /// Log the event parameters
    Log {
        #[serde(default)]
        label: Option<String>,
    },
    /// Run an external program with the parameters in its environment
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: BTreeMap<String, String>,
        #[serde(default = "default_hook_timeout_ms")]
        timeout_ms: u64,
    },
}

fn default_hook_timeout_ms() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PlayerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.stop_timeout(), Duration::from_secs(5));
        assert_eq!(config.volume_line(30), "volume 30");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [player]
            command = "/usr/local/bin/fake-player"
            crash_threshold = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.player.command, "/usr/local/bin/fake-player");
        assert_eq!(config.player.crash_threshold, 3);
        assert_eq!(config.player.quit_command, "quit");
        assert!(config.hooks.is_empty());
    }

    #[test]
    fn test_hooks_parse() {
        let config: Config = toml::from_str(
            r#"
            [[hooks]]
            component = "player"
            event = "song_start"
            kind = "log"

            [[hooks]]
            component = "player"
            event = "song_stop"
            kind = "command"
            program = "/usr/bin/logger"
            args = ["jukebox"]
            "#,
        )
        .unwrap();

        assert_eq!(config.hooks.len(), 2);
        assert_eq!(config.hooks[0].kind, HookKind::Log { label: None });
        match &config.hooks[1].kind {
            HookKind::Command { program, args, timeout_ms, .. } => {
                assert_eq!(program, "/usr/bin/logger");
                assert_eq!(args, &vec!["jukebox".to_string()]);
                assert_eq!(*timeout_ms, 10_000);
            }
            other => panic!("unexpected hook kind: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_crash_threshold() {
        let config = PlayerConfig {
            crash_threshold: 0,
            ..PlayerConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
