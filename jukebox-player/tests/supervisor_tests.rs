//! End-to-end supervisor behaviour against /bin/sh fake backends

mod helpers;

use helpers::*;
use jukebox_common::events::{EndReason, JukeboxEvent, SupervisorState};
use jukebox_player::db::{history, runtime, songs, votes};
use jukebox_player::playback::PauseOutcome;
use jukebox_player::Error;
use std::collections::HashMap;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn test_completed_song_clears_votes_and_leaves_no_process() {
    let pool = memory_pool().await;
    let dir = tempfile::tempdir().unwrap();
    let song = add_song_file(&pool, &dir, "a.ogg").await;
    votes::cast_vote(&pool, song.song_id, "alice", PLAYER_ID).await.unwrap();

    let Harness { supervisor, handle, mut events, .. } = supervisor(&pool, shell_player(INSTANT_PLAYER));
    let run = tokio::spawn(supervisor.run());

    let pid = match wait_for_event(&mut events, started).await {
        JukeboxEvent::SongStarted { song_id, process_id, .. } => {
            assert_eq!(song_id, song.song_id);
            process_id.expect("player pid")
        }
        other => panic!("unexpected event: {:?}", other),
    };

    match wait_for_event(&mut events, ended).await {
        JukeboxEvent::SongEnded { song_id, reason, .. } => {
            assert_eq!(song_id, song.song_id);
            assert_eq!(reason, EndReason::Complete);
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(!process_exists(pid), "player {} was not reaped", pid);

    handle.stop().await.unwrap();
    join(run).await.unwrap();

    assert!(votes::list_active_votes(&pool, PLAYER_ID).await.unwrap().is_empty());
    let played = history::recent_history(&pool, 10).await.unwrap();
    assert!(played.iter().any(|record| record.song_id == song.song_id));
    assert!(runtime::get_player_runtime_state(&pool, PLAYER_ID).await.unwrap().is_none());
    assert_eq!(handle.state(), SupervisorState::Stopped);
}

#[tokio::test]
async fn test_skip_then_stop_ends_each_song_once() {
    let pool = memory_pool().await;
    let dir = tempfile::tempdir().unwrap();
    let first = add_song_file(&pool, &dir, "first.ogg").await;
    let second = add_song_file(&pool, &dir, "second.ogg").await;
    votes::cast_vote(&pool, first.song_id, "alice", PLAYER_ID).await.unwrap();
    votes::cast_vote(&pool, second.song_id, "bob", PLAYER_ID).await.unwrap();

    let Harness { supervisor, handle, mut events, bus } = supervisor(&pool, shell_player(OBEDIENT_PLAYER));
    let mut record = bus.subscribe();
    let run = tokio::spawn(supervisor.run());

    wait_for_event(&mut events, |e| {
        matches!(e, JukeboxEvent::SongStarted { song_id, .. } if *song_id == first.song_id)
    })
    .await;
    handle.skip().await.unwrap();

    wait_for_event(&mut events, |e| {
        matches!(e, JukeboxEvent::SongStarted { song_id, .. } if *song_id == second.song_id)
    })
    .await;
    handle.stop().await.unwrap();
    join(run).await.unwrap();

    // Every start has exactly one matching end, in order
    let mut open: HashMap<i64, usize> = HashMap::new();
    let mut endings = Vec::new();
    for event in drain(&mut record) {
        match event {
            JukeboxEvent::SongStarted { song_id, .. } => *open.entry(song_id).or_default() += 1,
            JukeboxEvent::SongEnded { song_id, reason, .. } => {
                let count = open.entry(song_id).or_default();
                assert!(*count > 0, "song {} ended without starting", song_id);
                *count -= 1;
                endings.push((song_id, reason));
            }
            _ => {}
        }
    }
    assert!(open.values().all(|count| *count == 0));
    assert_eq!(
        endings,
        vec![(first.song_id, EndReason::Skip), (second.song_id, EndReason::Stop)]
    );

    // Skip counts as played, stop leaves the song queued
    let remaining = votes::list_active_votes(&pool, PLAYER_ID).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].song_id, second.song_id);
    let played = history::recent_history(&pool, 10).await.unwrap();
    assert_eq!(played.len(), 1);
    assert_eq!(played[0].song_id, first.song_id);
}

#[tokio::test]
async fn test_stop_preserves_votes_and_unregisters() {
    let pool = memory_pool().await;
    let dir = tempfile::tempdir().unwrap();
    let song = add_song_file(&pool, &dir, "a.ogg").await;
    votes::cast_vote(&pool, song.song_id, "alice", PLAYER_ID).await.unwrap();

    let Harness { supervisor, handle, mut events, .. } = supervisor(&pool, shell_player(OBEDIENT_PLAYER));
    let instance_id = supervisor.instance_id();
    let run = tokio::spawn(supervisor.run());

    wait_for_event(&mut events, started).await;
    let state = runtime::get_player_runtime_state(&pool, PLAYER_ID).await.unwrap().unwrap();
    assert_eq!(state.instance_id, instance_id);
    assert_eq!(state.current_song_id, Some(song.song_id));
    assert_eq!(state.local_process_id, std::process::id());

    handle.stop().await.unwrap();
    join(run).await.unwrap();

    assert_eq!(votes::list_active_votes(&pool, PLAYER_ID).await.unwrap().len(), 1);
    assert!(history::recent_history(&pool, 10).await.unwrap().is_empty());
    assert!(runtime::get_player_runtime_state(&pool, PLAYER_ID).await.unwrap().is_none());
    assert_eq!(handle.state(), SupervisorState::Stopped);
}

#[tokio::test]
async fn test_crash_loop_is_fatal_and_keeps_votes() {
    let pool = memory_pool().await;
    let dir = tempfile::tempdir().unwrap();
    let song = add_song_file(&pool, &dir, "a.ogg").await;
    votes::cast_vote(&pool, song.song_id, "alice", PLAYER_ID).await.unwrap();

    let Harness { supervisor, handle, mut events, .. } = supervisor(&pool, shell_player(CRASHING_PLAYER));
    let run = tokio::spawn(supervisor.run());

    let result = join(run).await;
    assert!(matches!(result, Err(Error::CrashLoop { crashes: 3, .. })));

    let reasons: Vec<EndReason> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            JukeboxEvent::SongEnded { song_id, reason, .. } => {
                assert_eq!(song_id, song.song_id);
                Some(reason)
            }
            _ => None,
        })
        .collect();
    assert_eq!(reasons, vec![EndReason::Crash; 3]);

    assert_eq!(votes::list_active_votes(&pool, PLAYER_ID).await.unwrap().len(), 1);
    assert!(history::recent_history(&pool, 10).await.unwrap().is_empty());
    assert!(runtime::get_player_runtime_state(&pool, PLAYER_ID).await.unwrap().is_none());
    assert_eq!(handle.state(), SupervisorState::Stopped);
}

#[tokio::test]
async fn test_missing_backend_counts_as_crash() {
    let pool = memory_pool().await;
    let dir = tempfile::tempdir().unwrap();
    add_song_file(&pool, &dir, "a.ogg").await;

    let mut config = shell_player(OBEDIENT_PLAYER);
    config.command = "/nonexistent/jukebox-backend".to_string();
    let Harness { supervisor, .. } = supervisor(&pool, config);

    let result = join(tokio::spawn(supervisor.run())).await;
    assert!(matches!(result, Err(Error::CrashLoop { .. })));
}

#[tokio::test]
async fn test_empty_queue_plays_random_online_song() {
    let pool = memory_pool().await;
    let dir = tempfile::tempdir().unwrap();
    let online = add_song_file(&pool, &dir, "online.ogg").await;
    let offline = songs::insert_song(&pool, &songs::NewSong {
        path: "http://radio.example/offline".to_string(),
        title: "Offline".to_string(),
        ..Default::default()
    })
    .await
    .unwrap();
    songs::set_song_online(&pool, offline.song_id, false).await.unwrap();

    let Harness { supervisor, handle, mut events, .. } = supervisor(&pool, shell_player(OBEDIENT_PLAYER));
    let run = tokio::spawn(supervisor.run());

    match wait_for_event(&mut events, started).await {
        JukeboxEvent::SongStarted { song_id, .. } => assert_eq!(song_id, online.song_id),
        other => panic!("unexpected event: {:?}", other),
    }

    handle.stop().await.unwrap();
    join(run).await.unwrap();
}

#[tokio::test]
async fn test_offline_song_with_file_present_returns_to_random_pool() {
    let pool = memory_pool().await;
    let dir = tempfile::tempdir().unwrap();
    let song = add_song_file(&pool, &dir, "back.ogg").await;
    songs::set_song_online(&pool, song.song_id, false).await.unwrap();

    let Harness { supervisor, handle, mut events, .. } = supervisor(&pool, shell_player(OBEDIENT_PLAYER));
    let run = tokio::spawn(supervisor.run());

    match wait_for_event(&mut events, started).await {
        JukeboxEvent::SongStarted { song_id, .. } => assert_eq!(song_id, song.song_id),
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(songs::get_song(&pool, song.song_id).await.unwrap().online);

    handle.stop().await.unwrap();
    join(run).await.unwrap();
}

#[tokio::test]
async fn test_voted_song_comes_back_when_its_file_returns() {
    let pool = memory_pool().await;
    let dir = tempfile::tempdir().unwrap();
    let flaky = add_song_file(&pool, &dir, "flaky.ogg").await;
    let steady = add_song_file(&pool, &dir, "steady.ogg").await;
    votes::cast_vote(&pool, flaky.song_id, "alice", PLAYER_ID).await.unwrap();

    // Share unmounted
    std::fs::remove_file(&flaky.path).unwrap();

    let Harness { supervisor, handle, mut events, .. } = supervisor(&pool, shell_player(OBEDIENT_PLAYER));
    let run = tokio::spawn(supervisor.run());

    match wait_for_event(&mut events, |e| matches!(e, JukeboxEvent::CandidateSkipped { .. })).await {
        JukeboxEvent::CandidateSkipped { song_id, .. } => assert_eq!(song_id, flaky.song_id),
        other => panic!("unexpected event: {:?}", other),
    }
    match wait_for_event(&mut events, started).await {
        JukeboxEvent::SongStarted { song_id, .. } => assert_eq!(song_id, steady.song_id),
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(!songs::get_song(&pool, flaky.song_id).await.unwrap().online);

    // Share mounted again
    std::fs::write(&flaky.path, b"not really audio").unwrap();
    handle.skip().await.unwrap();

    match wait_for_event(&mut events, started).await {
        JukeboxEvent::SongStarted { song_id, .. } => assert_eq!(song_id, flaky.song_id),
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(songs::get_song(&pool, flaky.song_id).await.unwrap().online);

    handle.stop().await.unwrap();
    join(run).await.unwrap();
}

#[tokio::test]
async fn test_unreachable_candidate_is_skipped() {
    let pool = memory_pool().await;
    let dir = tempfile::tempdir().unwrap();
    let missing = songs::insert_song(&pool, &songs::NewSong {
        path: dir.path().join("gone.ogg").to_string_lossy().to_string(),
        title: "Gone".to_string(),
        ..Default::default()
    })
    .await
    .unwrap();
    let present = add_song_file(&pool, &dir, "present.ogg").await;
    votes::cast_vote(&pool, missing.song_id, "alice", PLAYER_ID).await.unwrap();
    votes::cast_vote(&pool, present.song_id, "bob", PLAYER_ID).await.unwrap();

    let Harness { supervisor, handle, mut events, .. } = supervisor(&pool, shell_player(OBEDIENT_PLAYER));
    let run = tokio::spawn(supervisor.run());

    match wait_for_event(&mut events, |e| matches!(e, JukeboxEvent::CandidateSkipped { .. })).await {
        JukeboxEvent::CandidateSkipped { song_id, .. } => assert_eq!(song_id, missing.song_id),
        other => panic!("unexpected event: {:?}", other),
    }
    match wait_for_event(&mut events, started).await {
        JukeboxEvent::SongStarted { song_id, .. } => assert_eq!(song_id, present.song_id),
        other => panic!("unexpected event: {:?}", other),
    }

    handle.stop().await.unwrap();
    join(run).await.unwrap();

    assert!(!songs::get_song(&pool, missing.song_id).await.unwrap().online);
    // The skipped candidate was never played, so its vote stays
    let remaining: Vec<i64> = votes::list_active_votes(&pool, PLAYER_ID)
        .await
        .unwrap()
        .iter()
        .map(|vote| vote.song_id)
        .collect();
    assert!(remaining.contains(&missing.song_id));
}

#[tokio::test]
async fn test_controls_while_idle() {
    let pool = memory_pool().await;
    let Harness { supervisor, handle, .. } = supervisor(&pool, shell_player(OBEDIENT_PLAYER));
    let run = tokio::spawn(supervisor.run());

    handle
        .wait_for_state(|s| s == SupervisorState::Starting, WAIT)
        .await
        .unwrap();

    assert!(matches!(handle.skip().await, Err(Error::ProcessNotRunning(_))));
    assert!(matches!(handle.pause().await, Err(Error::ProcessNotRunning(_))));
    assert!(matches!(handle.set_volume(-1).await, Err(Error::InvalidArgument(_))));

    handle.set_volume(30).await.unwrap();
    let state = runtime::get_player_runtime_state(&pool, PLAYER_ID).await.unwrap().unwrap();
    assert_eq!(state.volume, 30);

    handle.stop().await.unwrap();
    join(run).await.unwrap();
    assert!(matches!(handle.skip().await, Err(Error::ProcessNotRunning(_))));
}

#[tokio::test]
async fn test_pause_toggles_state() {
    let pool = memory_pool().await;
    let dir = tempfile::tempdir().unwrap();
    add_song_file(&pool, &dir, "a.ogg").await;

    let Harness { supervisor, handle, mut events, .. } = supervisor(&pool, shell_player(OBEDIENT_PLAYER));
    let run = tokio::spawn(supervisor.run());
    wait_for_event(&mut events, started).await;

    assert_eq!(handle.pause().await.unwrap(), PauseOutcome::Paused);
    assert_eq!(handle.state(), SupervisorState::Paused);
    assert_eq!(handle.pause().await.unwrap(), PauseOutcome::Resumed);
    assert_eq!(handle.state(), SupervisorState::Playing);

    handle.stop().await.unwrap();
    join(run).await.unwrap();
}

#[tokio::test]
async fn test_pause_unsupported_is_reported_not_error() {
    let pool = memory_pool().await;
    let dir = tempfile::tempdir().unwrap();
    add_song_file(&pool, &dir, "a.ogg").await;

    let mut config = shell_player(OBEDIENT_PLAYER);
    config.supports_pause = false;
    let Harness { supervisor, handle, mut events, .. } = supervisor(&pool, config);
    let run = tokio::spawn(supervisor.run());
    wait_for_event(&mut events, started).await;

    assert_eq!(handle.pause().await.unwrap(), PauseOutcome::Unsupported);
    assert_eq!(handle.state(), SupervisorState::Playing);

    handle.stop().await.unwrap();
    join(run).await.unwrap();
}

#[tokio::test]
async fn test_volume_reaches_player() {
    let pool = memory_pool().await;
    let dir = tempfile::tempdir().unwrap();
    add_song_file(&pool, &dir, "a.ogg").await;
    let log = dir.path().join("commands.log");

    let script = format!(
        r#"while read line; do echo "$line" >> '{}'; [ "$line" = quit ] && exit 0; done"#,
        log.display()
    );
    let Harness { supervisor, handle, mut events, .. } = supervisor(&pool, shell_player(&script));
    let run = tokio::spawn(supervisor.run());
    wait_for_event(&mut events, started).await;

    handle.set_volume(70).await.unwrap();
    wait_for_event(&mut events, |e| matches!(e, JukeboxEvent::VolumeChanged { volume: 70, .. })).await;

    let mut content = String::new();
    for _ in 0..100 {
        content = std::fs::read_to_string(&log).unwrap_or_default();
        if content.contains("volume 70") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    // Initial volume is sent on spawn, then the change
    assert!(content.starts_with("volume 50\n"), "log was {:?}", content);
    assert!(content.contains("volume 70"), "log was {:?}", content);

    let state = runtime::get_player_runtime_state(&pool, PLAYER_ID).await.unwrap().unwrap();
    assert_eq!(state.volume, 70);

    handle.stop().await.unwrap();
    join(run).await.unwrap();
}

#[tokio::test]
async fn test_stop_kills_player_that_ignores_quit() {
    let pool = memory_pool().await;
    let dir = tempfile::tempdir().unwrap();
    add_song_file(&pool, &dir, "a.ogg").await;

    let mut config = shell_player(DEAF_PLAYER);
    config.stop_timeout_ms = 200;
    let Harness { supervisor, handle, mut events, .. } = supervisor(&pool, config);
    let run = tokio::spawn(supervisor.run());

    let pid = match wait_for_event(&mut events, started).await {
        JukeboxEvent::SongStarted { process_id, .. } => process_id.unwrap(),
        other => panic!("unexpected event: {:?}", other),
    };

    let begun = std::time::Instant::now();
    handle.stop().await.unwrap();
    join(run).await.unwrap();
    assert!(begun.elapsed() < Duration::from_secs(5));
    assert!(!process_exists(pid));

    let reasons: Vec<EndReason> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            JukeboxEvent::SongEnded { reason, .. } => Some(reason),
            _ => None,
        })
        .collect();
    assert_eq!(reasons, vec![EndReason::Stop]);
}

#[tokio::test]
async fn test_closed_event_stream_ends_song_as_complete() {
    let pool = memory_pool().await;
    let dir = tempfile::tempdir().unwrap();
    add_song_file(&pool, &dir, "a.ogg").await;

    let mut config = shell_player(HUNG_PLAYER);
    config.stop_timeout_ms = 200;
    let Harness { supervisor, handle, mut events, .. } = supervisor(&pool, config);
    let run = tokio::spawn(supervisor.run());

    match wait_for_event(&mut events, ended).await {
        JukeboxEvent::SongEnded { reason, .. } => assert_eq!(reason, EndReason::Complete),
        other => panic!("unexpected event: {:?}", other),
    }

    handle.stop().await.unwrap();
    join(run).await.unwrap();
}

struct FailingHook(std::sync::Arc<std::sync::atomic::AtomicUsize>);

impl jukebox_player::hooks::HookHandler for FailingHook {
    fn name(&self) -> &str {
        "failing"
    }

    fn handle(
        &self,
        _component: &str,
        _event: &str,
        _params: &jukebox_player::hooks::HookParams,
    ) -> jukebox_player::Result<jukebox_player::hooks::HookReply> {
        self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Err(Error::Internal("hook exploded".to_string()))
    }
}

#[tokio::test]
async fn test_failing_hooks_do_not_stop_playback() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let pool = memory_pool().await;
    let dir = tempfile::tempdir().unwrap();
    add_song_file(&pool, &dir, "a.ogg").await;

    let calls = Arc::new(AtomicUsize::new(0));
    let mut hooks = jukebox_player::hooks::HookRegistry::new();
    hooks.register("player", "song_start", Arc::new(FailingHook(Arc::clone(&calls))));
    hooks.register("player", "song_stop", Arc::new(FailingHook(Arc::clone(&calls))));

    let Harness { supervisor, handle, mut events, .. } =
        supervisor_with_hooks(&pool, shell_player(OBEDIENT_PLAYER), hooks);
    let run = tokio::spawn(supervisor.run());

    wait_for_event(&mut events, started).await;
    handle.skip().await.unwrap();
    wait_for_event(&mut events, ended).await;
    wait_for_event(&mut events, started).await;

    handle.stop().await.unwrap();
    join(run).await.unwrap();

    // start, stop, start, stop
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}
