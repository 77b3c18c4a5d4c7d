use crate::models::{PlayerConfig, PlayerKind};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// On-disk layout: a list of `[[players]]` tables
#[derive(Debug, Default, Deserialize)]
struct PlayersFile {
    #[serde(default)]
    players: Vec<PlayerConfig>,
}

/// Parse player configs from TOML text, keeping file order
pub fn parse_player_configs(text: &str) -> Result<Vec<PlayerConfig>> {
    let file: PlayersFile = toml::from_str(text).context("Failed to parse player configuration")?;

    for (idx, config) in file.players.iter().enumerate() {
        validate_config(config).with_context(|| format!("Invalid player #{} '{}'", idx + 1, config.name))?;
    }

    Ok(file.players)
}

/// Read and parse a players file
pub fn load_player_configs(path: &Path) -> Result<Vec<PlayerConfig>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let configs = parse_player_configs(&text)?;
    tracing::info!("Loaded {} player config(s) from {}", configs.len(), path.display());
    Ok(configs)
}

fn validate_config(config: &PlayerConfig) -> Result<()> {
    if config.name.trim().is_empty() {
        return Err(anyhow!("name must not be empty"));
    }
    match config.kind {
        PlayerKind::Vlc if config.host.trim().is_empty() => Err(anyhow!("VLC host must not be empty")),
        PlayerKind::Spotify if config.access_token.as_deref().unwrap_or("").is_empty() => {
            Err(anyhow!("Spotify players need an accessToken"))
        }
        _ => Ok(()),
    }
}
