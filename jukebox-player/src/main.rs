//! Jukebox Player (jukebox-player) - Main entry point
//!
//! `start` runs the supervisor for one player id; the other subcommands are
//! short-lived control and library tools that talk to it through the shared
//! database.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jukebox_common::config::{database_path, load_toml_config, resolve_config_path, resolve_root_folder};
use jukebox_common::db::init_database;
use jukebox_common::events::EventBus;
use jukebox_player::config::Config;
use jukebox_player::db::{history, songs, votes};
use jukebox_player::hooks::HookRegistry;
use jukebox_player::playback::{zap, PlayerSupervisor, RemoteControl};
use jukebox_player::queue::{load_fair_queue, QueueSlot};
use sqlx::{Pool, Sqlite};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for jukebox-player
#[derive(Parser, Debug)]
#[command(name = "jukebox-player")]
#[command(about = "Collaborative jukebox player supervisor")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, global = true, env = "JUKEBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the jukebox database
    #[arg(short, long, global = true, env = "JUKEBOX_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Player instance to run or control
    #[arg(short, long, global = true, env = "JUKEBOX_PLAYER_ID", default_value = "default")]
    player_id: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the player supervisor
    Start {
        /// Detach and run in the background
        #[arg(long)]
        daemon: bool,
    },
    /// Stop the running player
    Stop,
    /// Skip the current song
    Skip,
    /// Toggle pause
    Pause,
    /// Set the playback volume
    Volume {
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Clear the runtime state of a dead or stuck player
    Zap {
        /// Defaults to --player-id
        target: Option<String>,
    },
    /// Vote for a song
    Vote {
        song_id: i64,
        #[arg(long)]
        voter: String,
    },
    /// Print the fair play order
    Queue,
    /// Add a song to the library
    AddSong {
        path: String,
        #[arg(long, default_value = "")]
        artist: String,
        #[arg(long, default_value = "")]
        album: String,
        #[arg(long, default_value = "")]
        title: String,
        /// Length in seconds
        #[arg(long, default_value_t = 0)]
        length: i64,
        #[arg(long, default_value_t = 0)]
        track: i64,
    },
    /// Print recently played songs
    History {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jukebox_player=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let config: Config =
        load_toml_config(config_path.as_deref()).context("Failed to load configuration")?;
    let root_folder = resolve_root_folder(args.root_folder.as_deref(), config_path.as_deref());

    if let Command::Start { daemon: true } = args.command {
        let pid = daemonize(&args, config_path.as_deref(), &root_folder)?;
        println!("{}", pid);
        return Ok(());
    }

    let db = init_database(&database_path(&root_folder))
        .await
        .context("Failed to open database")?;

    match args.command {
        Command::Start { .. } => run_player(db, args.player_id, config).await?,
        Command::Stop => remote(db, &args.player_id).stop().await?,
        Command::Skip => remote(db, &args.player_id).skip().await?,
        Command::Pause => {
            let outcome = remote(db, &args.player_id).pause().await?;
            println!("{}", outcome.as_str());
        }
        Command::Volume { value } => {
            let volume = remote(db, &args.player_id).set_volume(&value).await?;
            println!("{}", volume);
        }
        Command::Zap { target } => {
            let target = target.unwrap_or(args.player_id);
            if !zap(&db, &target).await? {
                println!("{} had no runtime state", target);
            }
        }
        Command::Vote { song_id, voter } => {
            if !votes::cast_vote(&db, song_id, &voter, &args.player_id).await? {
                println!("{} already voted for {}", voter, song_id);
            }
        }
        Command::Queue => print_queue(&db, &args.player_id).await?,
        Command::AddSong {
            path,
            artist,
            album,
            title,
            length,
            track,
        } => {
            let song = songs::insert_song(&db, &songs::NewSong {
                path,
                artist,
                album,
                title,
                length,
                track,
            })
            .await?;
            println!("{}", song.song_id);
        }
        Command::History { limit } => {
            for record in history::recent_history(&db, limit).await? {
                println!(
                    "{}  {:>6}  {}",
                    record.played_at.format("%Y-%m-%d %H:%M:%S"),
                    record.song_id,
                    record.display_name
                );
            }
        }
    }

    Ok(())
}

fn remote(db: Pool<Sqlite>, player_id: &str) -> RemoteControl {
    RemoteControl::new(db, player_id)
}

/// Run the supervisor in the foreground until stopped or signalled
async fn run_player(db: Pool<Sqlite>, player_id: String, config: Config) -> Result<()> {
    info!(
        "Starting jukebox-player {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Player id: {}, backend: {}", player_id, config.player.command);

    config.player.validate()?;
    let hooks = Arc::new(HookRegistry::from_config(&config.hooks));
    let events = Arc::new(EventBus::default());
    let (supervisor, handle) = PlayerSupervisor::new(db, player_id, config.player, hooks, events);

    let mut run = tokio::spawn(supervisor.run());

    tokio::select! {
        result = &mut run => {
            result.context("Supervisor task panicked")??;
            return Ok(());
        }
        _ = shutdown_signal() => {
            if let Err(e) = handle.stop().await {
                warn!("Stop request failed: {}", e);
            }
        }
    }

    run.await.context("Supervisor task panicked")??;
    info!("Player shutdown complete");
    Ok(())
}

/// Re-run this binary detached with `start`, returning the child pid
fn daemonize(args: &Args, config_path: Option<&Path>, root_folder: &Path) -> Result<u32> {
    use std::os::unix::process::CommandExt;

    let exe = std::env::current_exe().context("Cannot locate own executable")?;
    let mut command = std::process::Command::new(exe);
    if let Some(path) = config_path {
        command.arg("--config").arg(path);
    }
    command
        .arg("--root-folder")
        .arg(root_folder)
        .arg("--player-id")
        .arg(&args.player_id)
        .arg("start")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0);

    let child = command.spawn().context("Failed to start background player")?;
    info!("Player {} running in background as pid {}", args.player_id, child.id());
    Ok(child.id())
}

async fn print_queue(db: &Pool<Sqlite>, player_id: &str) -> Result<()> {
    let queue = load_fair_queue(db, player_id).await?;
    for (position, slot) in queue.slots.iter().enumerate() {
        match slot {
            QueueSlot::Voted(entry) => {
                let voters: Vec<&str> = entry.contributing_voters.iter().map(String::as_str).collect();
                println!(
                    "{:>3}. [{}] {} ({})",
                    position + 1,
                    entry.song.song_id,
                    entry.song.display_name(),
                    voters.join(", ")
                );
            }
            QueueSlot::AnyOnlineSong => println!("(no votes: a random online song plays next)"),
        }
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
