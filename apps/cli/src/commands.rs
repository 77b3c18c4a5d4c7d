use crate::Command;
use anyhow::{anyhow, bail, Context, Result};
use scribectl_core::{
    insertion_text, search, seconds_to_timestamp, seek_target, sort_devices_for_display, split_terms, Candidate,
    ConfiguredPlayer, Playlist, SessionEvent, Searchable, Status, Track,
};
use scribectl_session::{Controller, PlayerSession, SearchKind, SearchResults};
use tokio::sync::broadcast::error::RecvError;

pub async fn run(controller: &Controller, selector: Option<&str>, command: Command) -> Result<()> {
    if let Command::Players = command {
        return list_players(controller).await;
    }

    let player = resolve_player(controller, selector).await?;
    let id = player.id;
    let session = controller
        .connect(id)
        .await
        .with_context(|| format!("Failed to connect to '{}'", player.config.name))?;

    match command {
        Command::Players => list_players(controller).await?,
        Command::Status => match session.current_status().await {
            Some(status) => println!("{}", describe(&status)),
            None => println!("No status yet"),
        },
        Command::Play => session.play().await?,
        Command::Pause => session.pause().await?,
        Command::Toggle => session.toggle_play().await?,
        Command::Next => session.next().await?,
        Command::Prev => session.previous().await?,
        Command::Seek { timestamp } => {
            let seconds = seek_target(&timestamp).ok_or_else(|| anyhow!("No timestamp found in '{}'", timestamp))?;
            session.seek(seconds).await?;
        }
        Command::Jump { seconds } => jump(&session, seconds).await?,
        Command::Volume { level } => session.set_volume(level).await?,
        Command::Mute => session.toggle_mute().await?,
        Command::Shuffle => session.toggle_shuffle().await?,
        Command::Repeat => session.toggle_repeat().await?,
        Command::Outputs => {
            let mut outputs = controller.outputs(id).await?;
            sort_devices_for_display(&mut outputs);
            for device in &outputs {
                let marker = if device.is_active { "*" } else { " " };
                println!("{} {:>4}  {}", marker, device.id, device.name);
            }
        }
        Command::Output { device } => {
            let outputs = controller.outputs(id).await?;
            let chosen = choose(&outputs, "output", &device, |d| d.id.as_str())?;
            controller.select_output(id, &chosen.id).await?;
            println!("Switched to {}", chosen.name);
        }
        Command::Playlists { terms } => {
            let found = controller.search(id, SearchKind::Playlists, &terms.join(" ")).await?;
            print_candidates(&found.candidates());
        }
        Command::Tracks { playlist, terms } => {
            let playlist = find_playlist(controller, id, &playlist).await?;
            let found = controller
                .search(id, SearchKind::Tracks(playlist), &terms.join(" "))
                .await?;
            print_candidates(&found.candidates());
        }
        Command::PlayTrack { playlist, terms } => {
            let playlist = find_playlist(controller, id, &playlist).await?;
            let query = terms.join(" ");
            let SearchResults::Tracks(tracks) = controller.search(id, SearchKind::Tracks(playlist), &query).await?
            else {
                bail!("Unexpected search result");
            };
            let track = single(&tracks, "track", &query)?;
            session.play_track(track).await?;
            println!("Playing {}", track.label());
        }
        Command::Timestamp => {
            let status = session.refresh().await?;
            println!("{}", insertion_text(status.time));
        }
        Command::Action { name, arg } => session.execute_action(&name, arg.as_deref()).await?,
        Command::Watch => watch(&session).await,
    }

    Ok(())
}

async fn list_players(controller: &Controller) -> Result<()> {
    let players = controller.configured().await;
    if players.is_empty() {
        println!("No players configured");
    }
    print_candidates(&players.iter().map(Candidate::from).collect::<Vec<_>>());
    Ok(())
}

async fn resolve_player(controller: &Controller, selector: Option<&str>) -> Result<ConfiguredPlayer> {
    match selector {
        Some(selector) => controller
            .find(selector)
            .await
            .ok_or_else(|| anyhow!("No player named '{}'", selector)),
        None => controller
            .configured()
            .await
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No players configured")),
    }
}

/// Jump relative to the current position
async fn jump(session: &PlayerSession, seconds: i64) -> Result<()> {
    if session.custom_actions().contains(&"jump") {
        session.execute_action("jump", Some(&seconds.to_string())).await?;
        return Ok(());
    }

    let status = session.refresh().await?;
    let target = (status.time as i64).saturating_add(seconds).max(0) as u64;
    session.seek(target).await?;
    Ok(())
}

async fn find_playlist(controller: &Controller, id: u64, query: &str) -> Result<Playlist> {
    let playlists = controller.playlists(id).await?;
    Ok(choose(&playlists, "playlist", query, |p| p.id.as_str())?.clone())
}

/// Exact id or name first, then a search over the name
fn choose<'a, T: Searchable>(items: &'a [T], what: &str, query: &str, id_of: impl Fn(&T) -> &str) -> Result<&'a T> {
    if let Some(item) = items
        .iter()
        .find(|i| id_of(i) == query || i.search_name().eq_ignore_ascii_case(query))
    {
        return Ok(item);
    }

    let found: Vec<&T> = search(&split_terms(query), items);
    match found.as_slice() {
        [item] => Ok(*item),
        [] => bail!("No {} matches '{}'", what, query),
        many => {
            let names: Vec<&str> = many.iter().map(|i| i.search_name()).collect();
            bail!("'{}' matches several {}s: {}", query, what, names.join(", "))
        }
    }
}

fn single<'a>(tracks: &'a [Track], what: &str, query: &str) -> Result<&'a Track> {
    match tracks {
        [track] => Ok(track),
        [] => bail!("No {} matches '{}'", what, query),
        many => bail!("'{}' matches {} {}s, be more specific", query, many.len(), what),
    }
}

async fn watch(session: &PlayerSession) {
    let mut rx = session.subscribe();
    if let Some(status) = session.current_status().await {
        println!("{}", describe(&status));
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => match event {
                Ok(SessionEvent::StatusUpdate(status)) => println!("{}", describe(&status)),
                Ok(SessionEvent::Disconnected) => {
                    println!("Disconnected from {}", session.name());
                    break;
                }
                Ok(SessionEvent::Connected) => {}
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
        }
    }
}

fn describe(status: &Status) -> String {
    let track = status
        .current_track
        .as_ref()
        .map(Track::label)
        .unwrap_or_else(|| "-".to_string());
    let muted = if status.is_muted { " (muted)" } else { "" };
    let output = status
        .active_device()
        .map(|d| format!("  -> {}", d.name))
        .unwrap_or_default();

    format!(
        "{:?} {} / {}  vol {}{}  {}{}",
        status.state,
        seconds_to_timestamp(status.time),
        seconds_to_timestamp(status.length),
        status.volume,
        muted,
        track,
        output
    )
}

fn print_candidates(candidates: &[Candidate]) {
    for candidate in candidates {
        match &candidate.detail {
            Some(detail) => println!("{:>6}  {}  ({})", candidate.id, candidate.label, detail),
            None => println!("{:>6}  {}", candidate.id, candidate.label),
        }
    }
}
