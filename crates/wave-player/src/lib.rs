//! Audio player with a waveform view.
//!
//! [`player::WaveformPlayer`] is the component: it owns the [`state::PlaybackState`], talks
//! to a [`wave_engine::engine::PlaybackEngine`], runs the polling loop and builds the
//! waveform through a [`loader::WaveformLoader`]. [`ui`] renders it in a terminal.

pub mod clock;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod player;
pub mod poll;
pub mod state;
pub mod ui;

#[cfg(test)]
mod testing;
