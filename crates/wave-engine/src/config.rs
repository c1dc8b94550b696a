use crate::source::FetchConfig;

/// Engine tuning parameters shared by fetch/decode/resample/playback stages.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Resampler chunk size in frames.
    pub chunk_frames: usize,
    /// Output device substring match; the host default device when unset.
    pub device: Option<String>,
    /// Source fetch settings.
    pub fetch: FetchConfig,
}

impl Default for EngineConfig {
    /// Defaults tuned for low-risk playback across common devices.
    fn default() -> Self {
        Self {
            chunk_frames: 1024,
            device: None,
            fetch: FetchConfig::default(),
        }
    }
}
