//! View state owned by the player component.

use wave_engine::waveform::Waveform;

use crate::error::WaveformError;

/// Everything the view renders. Mutated only by [`crate::player::WaveformPlayer`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlaybackState {
    /// Derived display flag; audio is driven by explicit engine commands.
    pub playing: bool,
    /// Displayed position in seconds.
    pub current_time: f64,
    /// Track length in seconds once known.
    pub duration: Option<f64>,
    pub speedup: bool,
    /// Set when the engine failed to load the source.
    pub load_error: Option<String>,
    /// Set when the waveform could not be fetched or decoded.
    pub waveform_error: Option<WaveformError>,
    pub waveform: Option<Waveform>,
}

/// What the main panel shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    /// Load error text instead of controls.
    LoadError,
    /// Full controls.
    Controls,
    /// Indeterminate progress while the duration is unknown.
    Loading,
}

impl PlaybackState {
    /// Peak amplitudes; empty until the waveform decoded.
    pub fn peaks(&self) -> &[f32] {
        self.waveform.as_ref().map(|w| w.peaks()).unwrap_or(&[])
    }

    /// Clamp `secs` into `[0, duration]` (or `[0, ∞)` while the duration is unknown).
    pub fn clamp_time(&self, secs: f64) -> f64 {
        let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        match self.duration {
            Some(duration) => secs.min(duration),
            None => secs,
        }
    }

    /// A load error wins over everything; controls need a known duration.
    pub fn display_mode(&self) -> DisplayMode {
        if self.load_error.is_some() {
            DisplayMode::LoadError
        } else if self.duration.is_some() {
            DisplayMode::Controls
        } else {
            DisplayMode::Loading
        }
    }

    /// Played fraction in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        match self.duration {
            Some(duration) if duration > 0.0 => (self.current_time / duration).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}
