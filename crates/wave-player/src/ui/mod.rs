//! Ratatui terminal view.
//!
//! Keys:
//! - Space / p: play/pause
//! - s: toggle speed
//! - Left/Right: seek -5s / +5s
//! - Home: seek to start
//! - l: logs
//! - q / Esc / Ctrl-C: quit
//!
//! Mouse: click the play or speed button, or the waveform to seek.

mod app;
mod render;
mod view_model;
mod widgets;

pub use app::run_tui;
