//! Shared fixtures for supervisor integration tests
#![allow(dead_code)]

use jukebox_common::db::{create_schema, Song};
use jukebox_common::events::{EventBus, JukeboxEvent};
use jukebox_player::config::PlayerConfig;
use jukebox_player::db::songs::{insert_song, NewSong};
use jukebox_player::hooks::HookRegistry;
use jukebox_player::playback::{PlayerSupervisor, SupervisorHandle};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast;

pub const PLAYER_ID: &str = "test-player";

/// Reads commands until `quit`, then exits cleanly
pub const OBEDIENT_PLAYER: &str = r#"while read line; do [ "$line" = quit ] && exit 0; done"#;

/// Exits immediately as if the song finished
pub const INSTANT_PLAYER: &str = "exit 0";

/// Fails immediately
pub const CRASHING_PLAYER: &str = "exit 3";

/// Ignores its command channel entirely
pub const DEAF_PLAYER: &str = "exec sleep 30";

/// Closes its event stream but keeps running
pub const HUNG_PLAYER: &str = "exec >&-; exec sleep 30";

pub async fn memory_pool() -> Pool<Sqlite> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();
    pool
}

/// Backend config running `script` under /bin/sh with fast timings
pub fn shell_player(script: &str) -> PlayerConfig {
    PlayerConfig {
        command: "/bin/sh".to_string(),
        args: vec!["-c".to_string(), script.to_string(), "fake-player".to_string()],
        stop_timeout_ms: 2000,
        crash_threshold: 3,
        command_poll_ms: 20,
        idle_retry_ms: 100,
        ..PlayerConfig::default()
    }
}

/// Create an empty file for a song and register it
pub async fn add_song_file(pool: &Pool<Sqlite>, dir: &TempDir, name: &str) -> Song {
    let path = dir.path().join(name);
    std::fs::write(&path, b"not really audio").unwrap();
    insert_song(pool, &NewSong {
        path: path.to_string_lossy().to_string(),
        title: name.to_string(),
        ..Default::default()
    })
    .await
    .unwrap()
}

pub struct Harness {
    pub supervisor: PlayerSupervisor,
    pub handle: SupervisorHandle,
    pub events: broadcast::Receiver<JukeboxEvent>,
    pub bus: Arc<EventBus>,
}

pub fn supervisor(pool: &Pool<Sqlite>, config: PlayerConfig) -> Harness {
    supervisor_with_hooks(pool, config, HookRegistry::new())
}

pub fn supervisor_with_hooks(pool: &Pool<Sqlite>, config: PlayerConfig, hooks: HookRegistry) -> Harness {
    let bus = Arc::new(EventBus::new(1024));
    let events = bus.subscribe();
    let (supervisor, handle) =
        PlayerSupervisor::new(pool.clone(), PLAYER_ID, config, Arc::new(hooks), Arc::clone(&bus));
    Harness {
        supervisor,
        handle,
        events,
        bus,
    }
}

/// Wait for the first event accepted by `accept`
pub async fn wait_for_event<F>(events: &mut broadcast::Receiver<JukeboxEvent>, mut accept: F) -> JukeboxEvent
where
    F: FnMut(&JukeboxEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let event = events.recv().await.unwrap();
            if accept(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Everything still buffered in `events`
pub fn drain(events: &mut broadcast::Receiver<JukeboxEvent>) -> Vec<JukeboxEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

pub fn started(event: &JukeboxEvent) -> bool {
    matches!(event, JukeboxEvent::SongStarted { .. })
}

pub fn ended(event: &JukeboxEvent) -> bool {
    matches!(event, JukeboxEvent::SongEnded { .. })
}

pub fn process_exists(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{}", pid)).exists()
}

pub async fn join<T>(task: tokio::task::JoinHandle<T>) -> T {
    tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .expect("supervisor did not finish")
        .unwrap()
}
