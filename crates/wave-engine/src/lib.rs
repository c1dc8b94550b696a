//! Audio plumbing behind the waveform player.
//!
//! - [`source`]: fetch raw bytes from a URL or local path
//! - [`context`] / [`decode`]: Symphonia registries and full-buffer decoding
//! - [`waveform`]: peak extraction for display
//! - [`resample`] / [`device`] / [`playback`]: CPAL output at the device rate
//! - [`engine`]: the `PlaybackEngine` seam and its CPAL implementation

pub mod config;
pub mod context;
pub mod decode;
pub mod device;
pub mod engine;
pub mod playback;
pub mod resample;
pub mod source;
pub mod transport;
pub mod waveform;
