mod common;

use common::*;
use scribectl_core::{
    Action, ActionError, ActionKind, ConnectError, EventKind, FetchError, ParseError, PlaybackState, PlayerConfig,
    SessionEvent, TransportError,
};
use scribectl_session::{PlayerSession, SessionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

#[tokio::test]
async fn test_connect_emits_connected_then_status() {
    let backend = FakeBackend::new();
    let session = quiet_session(&backend);
    let mut rx = session.subscribe();

    session.connect().await.unwrap();

    assert_eq!(session.state().await, SessionState::Connected);
    assert_eq!(rx.recv().await.unwrap(), SessionEvent::Connected);
    assert_eq!(rx.recv().await.unwrap(), SessionEvent::StatusUpdate(idle_status()));
    assert_eq!(session.current_status().await, Some(idle_status()));
    assert_eq!(backend.fetch_count(), 1);
}

#[tokio::test]
async fn test_failed_connect_stays_disconnected() {
    let backend = FakeBackend::new();
    backend.push_result(Err(refused()));
    let session = quiet_session(&backend);
    let mut rx = session.subscribe();

    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, ConnectError::Transport(TransportError::Network(_))));
    assert_eq!(session.state().await, SessionState::Disconnected);
    assert_eq!(session.current_status().await, None);
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

    // Next attempt goes through
    session.connect().await.unwrap();
    assert!(session.is_connected().await);
}

#[tokio::test]
async fn test_connect_twice_is_rejected() {
    let backend = FakeBackend::new();
    let session = quiet_session(&backend);

    session.connect().await.unwrap();
    assert_eq!(session.connect().await, Err(ConnectError::AlreadyConnected));
    assert_eq!(backend.fetch_count(), 1);
}

#[tokio::test]
async fn test_disconnect_is_idempotent_and_offline() {
    let backend = FakeBackend::new();
    let session = quiet_session(&backend);
    session.connect().await.unwrap();
    let mut rx = session.subscribe();

    assert!(session.disconnect().await);
    assert!(!session.disconnect().await);

    assert_eq!(session.state().await, SessionState::Disconnected);
    assert_eq!(rx.try_recv(), Ok(SessionEvent::Disconnected));
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(backend.fetch_count(), 1);
    assert!(backend.executed().is_empty());

    // The last snapshot survives the disconnect
    assert_eq!(session.current_status().await, Some(idle_status()));
}

#[tokio::test]
async fn test_actions_require_connection() {
    let backend = FakeBackend::new();
    let session = quiet_session(&backend);

    assert_eq!(session.play().await, Err(ActionError::NotConnected));
    assert_eq!(session.get_playlists().await, Err(ActionError::NotConnected));
    assert_eq!(session.refresh().await, Err(ActionError::NotConnected));

    session.connect().await.unwrap();
    session.disconnect().await;

    assert_eq!(session.seek(30).await, Err(ActionError::NotConnected));
    assert_eq!(session.get_devices().await, Err(ActionError::NotConnected));
    assert!(backend.executed().is_empty());
}

#[tokio::test]
async fn test_action_resyncs_status() {
    let backend = FakeBackend::new();
    let session = quiet_session(&backend);
    session.connect().await.unwrap();
    let mut rx = session.subscribe();

    session.play().await.unwrap();

    assert_eq!(backend.executed(), vec![Action::Play]);
    assert_eq!(backend.fetch_count(), 2);
    let status = session.current_status().await.unwrap();
    assert_eq!(status.state, PlaybackState::Playing);
    assert_eq!(rx.try_recv(), Ok(SessionEvent::StatusUpdate(status)));
}

#[tokio::test]
async fn test_unchanged_refresh_emits_nothing() {
    let backend = FakeBackend::new();
    let session = quiet_session(&backend);
    session.connect().await.unwrap();
    let mut rx = session.subscribe();

    let status = session.refresh().await.unwrap();
    assert_eq!(status, idle_status());
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn test_set_volume_is_clamped() {
    let backend = FakeBackend::new();
    let session = quiet_session(&backend);
    session.connect().await.unwrap();

    session.set_volume(150).await.unwrap();
    session.set_volume(40).await.unwrap();

    assert_eq!(backend.executed(), vec![Action::SetVolume(100), Action::SetVolume(40)]);
    assert_eq!(session.current_status().await.unwrap().volume, 40);
}

#[tokio::test]
async fn test_unsupported_actions_are_refused() {
    let backend = FakeBackend::with_actions(&[ActionKind::Play, ActionKind::Pause, ActionKind::Custom]);
    let session = quiet_session(&backend);
    session.connect().await.unwrap();

    assert_eq!(
        session.toggle_mute().await,
        Err(ActionError::Unsupported("toggleMute".to_string()))
    );
    assert_eq!(
        session.execute_action("jump", Some("+10")).await,
        Err(ActionError::Unsupported("jump".to_string()))
    );
    assert!(backend.executed().is_empty());

    session.execute_action("stop", None).await.unwrap();
    assert_eq!(
        backend.executed(),
        vec![Action::Custom { name: "stop".to_string(), arg: None }]
    );
}

#[tokio::test]
async fn test_late_response_after_disconnect_is_discarded() {
    let backend = FakeBackend::new();
    let session = quiet_session(&backend);
    session.connect().await.unwrap();
    let mut rx = session.subscribe();

    let mut playing = idle_status();
    playing.state = PlaybackState::Playing;
    backend.set_status(playing);
    backend.hold_next_fetch();

    let pending = tokio::spawn({
        let session = session.clone();
        async move { session.refresh().await }
    });
    backend.entered.notified().await;

    session.disconnect().await;
    backend.release.notify_one();

    assert_eq!(pending.await.unwrap(), Err(ActionError::NotConnected));
    assert_eq!(session.current_status().await, Some(idle_status()));
    assert_eq!(rx.try_recv(), Ok(SessionEvent::Disconnected));
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn test_response_from_previous_connection_is_discarded() {
    let backend = FakeBackend::new();
    let session = quiet_session(&backend);
    session.connect().await.unwrap();

    let mut playing = idle_status();
    playing.state = PlaybackState::Playing;
    backend.push_result(Ok(playing));
    backend.hold_next_fetch();

    let pending = tokio::spawn({
        let session = session.clone();
        async move { session.refresh().await }
    });
    backend.entered.notified().await;

    // Reconnect while the old request is still out; connect queues behind it
    session.disconnect().await;
    let reconnect = tokio::spawn({
        let session = session.clone();
        async move { session.connect().await }
    });
    backend.release.notify_one();

    assert_eq!(pending.await.unwrap(), Err(ActionError::NotConnected));
    reconnect.await.unwrap().unwrap();
    assert_eq!(session.current_status().await, Some(idle_status()));
}

#[tokio::test(start_paused = true)]
async fn test_poll_emits_only_on_change() {
    let backend = FakeBackend::new();
    let session = session_with(&backend, PlayerConfig::vlc("Desk", "secret"), fast_options());
    session.connect().await.unwrap();
    let mut rx = session.subscribe();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(backend.fetch_count(), 2);
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

    let mut paused = idle_status();
    paused.state = PlaybackState::Paused;
    paused.time = 12;
    backend.set_status(paused.clone());

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(backend.fetch_count(), 3);
    assert_eq!(rx.try_recv(), Ok(SessionEvent::StatusUpdate(paused)));
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test(start_paused = true)]
async fn test_polling_stops_after_disconnect() {
    let backend = FakeBackend::new();
    let session = session_with(&backend, PlayerConfig::vlc("Desk", "secret"), fast_options());
    session.connect().await.unwrap();
    session.disconnect().await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(backend.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_poll_error_disconnects() {
    let backend = FakeBackend::new();
    let session = session_with(&backend, PlayerConfig::vlc("Desk", "secret"), fast_options());
    session.connect().await.unwrap();
    let disconnected = session.once(EventKind::Disconnected);

    backend.set_fetch_error(Some(refused()));

    let event = tokio::time::timeout(Duration::from_secs(5), disconnected.wait())
        .await
        .unwrap();
    assert_eq!(event, Some(SessionEvent::Disconnected));
    assert_eq!(session.state().await, SessionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_transient_poll_errors_keep_session() {
    let backend = FakeBackend::new();
    let session = session_with(&backend, PlayerConfig::vlc("Desk", "secret"), fast_options());
    session.connect().await.unwrap();

    backend.push_result(Err(FetchError::Transport(TransportError::Timeout)));
    backend.push_result(Err(FetchError::Parse(ParseError::MalformedXml("truncated".into()))));

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert!(session.is_connected().await);
    assert_eq!(backend.fetch_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_poll_skips_tick_while_fetch_in_flight() {
    let backend = FakeBackend::new();
    let session = session_with(&backend, PlayerConfig::vlc("Desk", "secret"), fast_options());
    session.connect().await.unwrap();

    backend.hold_next_fetch();
    let pending = tokio::spawn({
        let session = session.clone();
        async move { session.refresh().await }
    });
    backend.entered.notified().await;

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(backend.fetch_count(), 2);

    backend.release.notify_one();
    pending.await.unwrap().unwrap();
    assert_eq!(backend.fetch_count(), 2);
}

#[tokio::test]
async fn test_initial_output_selected_on_connect() {
    let backend = FakeBackend::new();
    let mut config = PlayerConfig::vlc("Desk", "secret");
    config.initial_output = Some("headphones".to_string());
    let session = session_with(&backend, config, quiet_options());

    session.connect().await.unwrap();

    assert_eq!(backend.executed(), vec![Action::SelectOutput("2".to_string())]);
    let status = session.current_status().await.unwrap();
    assert_eq!(status.active_device().map(|d| d.name.as_str()), Some("Headphones"));
}

#[tokio::test]
async fn test_default_output_ignored_while_output_active() {
    let backend = FakeBackend::new();
    let mut config = PlayerConfig::vlc("Desk", "secret");
    config.default_output_name = Some("Headphones".to_string());
    let session = session_with(&backend, config, quiet_options());

    session.connect().await.unwrap();
    assert!(backend.executed().is_empty());
}

#[tokio::test]
async fn test_default_output_applied_when_nothing_active() {
    let backend = FakeBackend::new();
    let mut status = idle_status();
    for device in &mut status.devices {
        device.is_active = false;
    }
    backend.set_status(status);

    let mut config = PlayerConfig::vlc("Desk", "secret");
    config.default_output_id = Some("2".to_string());
    let session = session_with(&backend, config, quiet_options());

    session.connect().await.unwrap();
    assert_eq!(backend.executed(), vec![Action::SelectOutput("2".to_string())]);
}

fn headphones_session(backend: &Arc<FakeBackend>) -> PlayerSession {
    let mut config = PlayerConfig::vlc("Desk", "secret");
    config.initial_output = Some("Headphones".to_string());
    session_with(backend, config, fast_options())
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_during_initial_output_starts_no_polling() {
    let backend = FakeBackend::new();
    let session = headphones_session(&backend);
    backend.hold_next_execute();

    let connecting = tokio::spawn({
        let session = session.clone();
        async move { session.connect().await }
    });
    backend.exec_entered.notified().await;

    assert!(session.disconnect().await);
    backend.exec_release.notify_one();

    assert_eq!(connecting.await.unwrap(), Err(ConnectError::Cancelled));
    assert_eq!(session.state().await, SessionState::Disconnected);

    let before = backend.fetch_count();
    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(backend.fetch_count(), before);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_during_initial_output_keeps_new_polling() {
    let backend = FakeBackend::new();
    let session = headphones_session(&backend);
    backend.hold_next_execute();

    let first = tokio::spawn({
        let session = session.clone();
        async move { session.connect().await }
    });
    backend.exec_entered.notified().await;

    session.disconnect().await;
    session.connect().await.unwrap();
    backend.exec_release.notify_one();

    assert_eq!(first.await.unwrap(), Err(ConnectError::Cancelled));
    assert!(session.is_connected().await);

    // The second connection's poll task is the one still running
    let before = backend.fetch_count();
    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert!(session.is_connected().await);
    assert_eq!(backend.fetch_count(), before + 3);
}

#[tokio::test]
async fn test_play_track_selects_playlist_item() {
    let backend = FakeBackend::new();
    let session = quiet_session(&backend);
    session.connect().await.unwrap();

    session.play_track(&track("7", "Interview")).await.unwrap();
    assert_eq!(backend.executed(), vec![Action::SelectPlaylistItem("7".to_string())]);
}
