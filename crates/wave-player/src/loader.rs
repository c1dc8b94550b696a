//! Waveform loading (fetch + decode off the UI thread).

use std::sync::Arc;

use crossbeam_channel::Sender;
use wave_engine::context::SharedContext;
use wave_engine::decode;
use wave_engine::source::{self, CancelToken, FetchConfig};
use wave_engine::waveform::{DEFAULT_SCALE, Waveform};

use crate::error::WaveformError;

/// Result of one waveform load.
#[derive(Clone, Debug, PartialEq)]
pub enum LoaderEvent {
    Ready(Waveform),
    Failed(WaveformError),
}

/// Produces the waveform for a source.
pub trait WaveformLoader {
    /// Start loading `source`. Nothing is sent once `cancel` has fired.
    fn spawn(&self, source: &str, cancel: CancelToken, events: Sender<LoaderEvent>);
}

/// Fetches the source and decodes it on a worker thread.
pub struct FetchingLoader {
    contexts: Arc<SharedContext>,
    fetch: FetchConfig,
    scale: usize,
}

impl FetchingLoader {
    pub fn new(contexts: Arc<SharedContext>, fetch: FetchConfig, scale: usize) -> Self {
        Self {
            contexts,
            fetch,
            scale,
        }
    }
}

impl WaveformLoader for FetchingLoader {
    fn spawn(&self, source: &str, cancel: CancelToken, events: Sender<LoaderEvent>) {
        let source = source.to_string();
        let contexts = self.contexts.clone();
        let fetch = self.fetch.clone();
        let scale = self.scale;
        std::thread::spawn(move || {
            let Some(event) = load_waveform(&source, &contexts, &fetch, scale, &cancel) else {
                tracing::debug!(source = %source, "waveform load cancelled");
                return;
            };
            if !cancel.is_cancelled() {
                let _ = events.send(event);
            }
        });
    }
}

/// Fetch and decode; `None` when cancelled.
fn load_waveform(
    source: &str,
    contexts: &SharedContext,
    fetch: &FetchConfig,
    scale: usize,
    cancel: &CancelToken,
) -> Option<LoaderEvent> {
    let bytes = match source::fetch_bytes(source, fetch, cancel) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(e) => return Some(LoaderEvent::Failed(WaveformError::Fetch(format!("{e:#}")))),
    };
    let hint = decode::hint_for_source(source);
    let ctx = contexts.acquire();
    let result = Waveform::from_bytes(&ctx, bytes, hint, DEFAULT_SCALE).and_then(|w| w.resample(scale));
    Some(match result {
        Ok(waveform) => LoaderEvent::Ready(waveform),
        Err(e) => LoaderEvent::Failed(WaveformError::Decode(format!("{e:#}"))),
    })
}
