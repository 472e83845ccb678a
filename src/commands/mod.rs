//! Tauri command handlers
//!
//! IPC commands the frontend calls through Tauri's invoke system, plus the
//! adapters that drive the webview's video and replayer.

pub mod player;
pub mod webview;
