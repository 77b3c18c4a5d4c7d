mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use scribectl_session::{Controller, SessionOptions};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "scribectl", version, about = "Control VLC or Spotify while transcribing")]
struct Cli {
    /// Players file (defaults to <config dir>/scribectl/players.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Player to talk to, by name or id (defaults to the first configured)
    #[arg(long, short, global = true)]
    player: Option<String>,

    /// Status poll interval in milliseconds
    #[arg(long, global = true, default_value_t = 1000)]
    poll_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List configured players
    Players,
    /// Show the current playback status
    Status,
    Play,
    Pause,
    /// Toggle between playing and paused
    Toggle,
    Next,
    Prev,
    /// Seek to a timestamp such as 1:23 or 1:02:03
    Seek { timestamp: String },
    /// Skip forward (or back, if negative) by some seconds
    Jump {
        #[arg(allow_hyphen_values = true)]
        seconds: i64,
    },
    Volume { level: u32 },
    Mute,
    Shuffle,
    Repeat,
    /// List audio outputs
    Outputs,
    /// Switch to an output by id or name
    Output { device: String },
    /// List playlists, optionally filtered by search terms
    Playlists { terms: Vec<String> },
    /// List the tracks of a playlist, optionally filtered
    Tracks { playlist: String, terms: Vec<String> },
    /// Play the single track of a playlist matching the terms
    PlayTrack {
        playlist: String,
        #[arg(required = true)]
        terms: Vec<String>,
    },
    /// Print the current position as an insertable timestamp
    Timestamp,
    /// Run a player-specific action
    Action { name: String, arg: Option<String> },
    /// Print status updates until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scribectl=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => get_config_path()?,
    };
    tracing::debug!("Config path: {}", config_path.display());

    let configs = scribectl_core::load_player_configs(&config_path)?;
    let controller = Controller::with_default_backends(SessionOptions {
        poll_interval: Duration::from_millis(cli.poll_ms.max(100)),
    });
    controller.load(configs).await;

    let result = commands::run(&controller, cli.player.as_deref(), cli.command).await;
    controller.teardown().await;
    result
}

/// Get the players file path (platform-specific)
fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Failed to get config directory"))?
        .join("scribectl");

    Ok(config_dir.join("players.toml"))
}
