use std::fmt;

/// Load error text used when the engine fails without a message.
pub const STARTUP_ERROR: &str = "Startup error";

/// Why the waveform could not be built. Kept apart from playback load errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WaveformError {
    /// The source bytes could not be retrieved.
    Fetch(String),
    /// The bytes were retrieved but could not be turned into peaks.
    Decode(String),
}

impl WaveformError {
    pub fn kind(&self) -> &'static str {
        match self {
            WaveformError::Fetch(_) => "fetch",
            WaveformError::Decode(_) => "decode",
        }
    }
}

impl fmt::Display for WaveformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaveformError::Fetch(msg) => write!(f, "fetch failed: {msg}"),
            WaveformError::Decode(msg) => write!(f, "decode failed: {msg}"),
        }
    }
}

impl std::error::Error for WaveformError {}
