//! Extension hooks
//!
//! Handlers are registered per `(component, event)` and run in registration
//! order. Each may return an opaque JSON value, collected into the
//! [`HookOutcome`], and may end the chain early with [`HookFlow::Stop`].
//! A failing handler is logged and skipped; hooks never abort playback.

use crate::config::{HookConfig, HookKind};
use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Component name used for player lifecycle events
pub const PLAYER_COMPONENT: &str = "player";
pub const SONG_START_EVENT: &str = "song_start";
pub const SONG_STOP_EVENT: &str = "song_stop";

/// Event parameters passed to every handler
pub type HookParams = BTreeMap<String, String>;

/// Whether the remaining handlers for an event should run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookFlow {
    Continue,
    Stop,
}

/// What a single handler returned
#[derive(Debug, Clone, PartialEq)]
pub struct HookReply {
    pub value: Option<serde_json::Value>,
    pub flow: HookFlow,
}

impl HookReply {
    /// No value, keep going
    pub fn proceed() -> Self {
        Self { value: None, flow: HookFlow::Continue }
    }

    pub fn value(value: serde_json::Value) -> Self {
        Self { value: Some(value), flow: HookFlow::Continue }
    }

    /// Short-circuit the remaining handlers
    pub fn stop() -> Self {
        Self { value: None, flow: HookFlow::Stop }
    }
}

/// Collected result of firing one event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookOutcome {
    /// Values returned by handlers, in handler order
    pub values: Vec<serde_json::Value>,
    /// A handler asked to stop the chain
    pub stopped: bool,
    /// Handlers that returned an error
    pub failures: usize,
}

/// A pluggable event handler
pub trait HookHandler: Send + Sync {
    fn name(&self) -> &str;

    fn handle(&self, component: &str, event: &str, params: &HookParams) -> Result<HookReply>;
}

/// Registered-handler table
#[derive(Default)]
pub struct HookRegistry {
    handlers: HashMap<(String, String), Vec<Arc<dyn HookHandler>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from `[[hooks]]` config entries
    pub fn from_config(hooks: &[HookConfig]) -> Self {
        let mut registry = Self::new();
        for hook in hooks {
            let handler: Arc<dyn HookHandler> = match &hook.kind {
                HookKind::Log { label } => Arc::new(LogHook {
                    label: label.clone().unwrap_or_else(|| "hook".to_string()),
                }),
                HookKind::Command { program, args, env, timeout_ms } => Arc::new(CommandHook {
                    program: program.clone(),
                    args: args.clone(),
                    env: env.clone(),
                    timeout: Duration::from_millis(*timeout_ms),
                }),
            };
            registry.register(&hook.component, &hook.event, handler);
        }
        info!("Registered {} extension hooks", registry.handler_count());
        registry
    }

    pub fn register(&mut self, component: &str, event: &str, handler: Arc<dyn HookHandler>) {
        self.handlers
            .entry((component.to_string(), event.to_string()))
            .or_default()
            .push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    /// Run every handler registered for `(component, event)`
    pub fn fire_event(&self, component: &str, event: &str, params: &HookParams) -> HookOutcome {
        let mut outcome = HookOutcome::default();
        let Some(handlers) = self
            .handlers
            .get(&(component.to_string(), event.to_string()))
        else {
            return outcome;
        };

        for handler in handlers {
            match handler.handle(component, event, params) {
                Ok(reply) => {
                    if let Some(value) = reply.value {
                        outcome.values.push(value);
                    }
                    if reply.flow == HookFlow::Stop {
                        debug!("Hook {} stopped {}_{} chain", handler.name(), component, event);
                        outcome.stopped = true;
                        break;
                    }
                }
                Err(e) => {
                    warn!("Hook {} failed on {}_{}: {}", handler.name(), component, event, e);
                    outcome.failures += 1;
                }
            }
        }

        outcome
    }
}

/// Logs the event and its parameters
struct LogHook {
    label: String,
}

impl HookHandler for LogHook {
    fn name(&self) -> &str {
        &self.label
    }

    fn handle(&self, component: &str, event: &str, params: &HookParams) -> Result<HookReply> {
        info!("[{}] {}_{} {:?}", self.label, component, event, params);
        Ok(HookReply::proceed())
    }
}

/// Spawns an external program with the parameters as `JUKEBOX_<KEY>`
/// environment variables. The child is reaped in the background and killed
/// if it outlives its timeout.
struct CommandHook {
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    timeout: Duration,
}

impl HookHandler for CommandHook {
    fn name(&self) -> &str {
        &self.program
    }

    fn handle(&self, component: &str, event: &str, params: &HookParams) -> Result<HookReply> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Internal(format!("command hook needs a runtime: {}", e)))?;

        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(&self.args)
            .envs(&self.env)
            .env("JUKEBOX_COMPONENT", component)
            .env("JUKEBOX_EVENT", event)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true);
        for (key, value) in params {
            command.env(format!("JUKEBOX_{}", key.to_uppercase()), value);
        }

        let mut child = {
            let _guard = runtime.enter();
            command.spawn()?
        };
        let pid = child.id();
        let program = self.program.clone();
        let timeout = self.timeout;

        runtime.spawn(async move {
            match tokio::time::timeout(timeout, child.wait()).await {
                Ok(Ok(status)) if !status.success() => {
                    warn!("Hook command {} exited with {}", program, status);
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("Hook command {} wait failed: {}", program, e),
                Err(_) => {
                    warn!("Hook command {} timed out after {:?}, killing", program, timeout);
                    let _ = child.kill().await;
                }
            }
        });

        Ok(HookReply::value(serde_json::json!({
            "program": self.program,
            "pid": pid,
        })))
    }
}
