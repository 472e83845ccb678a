//! Session Replay - synchronized playback of captured QA browser sessions.
//!
//! Loads a recording (video, rrweb DOM events, console and network logs) and
//! presents it as one seekable timeline with markers and progressively
//! revealed logs. The core is headless; the `desktop` feature adds the Tauri
//! shell that drives a webview player.

#[cfg(feature = "desktop")]
pub mod commands;
pub mod player;
pub mod recording;
pub mod replay;
pub mod timeline;
pub mod utils;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber. Later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_replay_lib=debug,tauri=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Initialize the application
#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use commands::player::PlayerState;
    use tauri::Manager;

    init_tracing();

    tracing::info!("Starting Session Replay v{}", env!("CARGO_PKG_VERSION"));

    tauri::Builder::default()
        .setup(|app| {
            let state = PlayerState::initialize(app.handle())?;
            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::player::open_recording,
            commands::player::close_recording,
            commands::player::player_play,
            commands::player::player_pause,
            commands::player::player_seek,
            commands::player::player_restart,
            commands::player::player_seek_to_marker,
            commands::player::player_step_marker,
            commands::player::report_video_event,
            commands::player::get_player_view,
            commands::player::get_visible_logs,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
