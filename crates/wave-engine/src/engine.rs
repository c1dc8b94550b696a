//! Playback engine seam and its CPAL implementation.
//!
//! [`PlaybackEngine`] is what the player component talks to: load a source, explicit
//! play/pause, stop, seek, rate, and position/duration queries. Loading is asynchronous;
//! the outcome arrives as an [`EngineEvent`] on the channel passed to `load`.
//!
//! [`CpalEngine`] runs one session thread per load. The thread fetches and fully decodes the
//! source, resamples it to the output device rate, then owns the CPAL stream until the
//! engine is dropped or reloaded. Transport commands go straight to the shared
//! [`Transport`] atomics.

use std::sync::Arc;

use anyhow::{Context, Result};
use cpal::traits::StreamTrait;
use crossbeam_channel::{Receiver, Sender};

use crate::config::EngineConfig;
use crate::context::SharedContext;
use crate::playback::{self, PcmTrack};
use crate::source::{self, CancelToken};
use crate::transport::Transport;
use crate::{decode, device, resample};

/// Outcome of [`PlaybackEngine::load`].
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// The source is ready to play.
    Loaded { duration_secs: f64 },
    /// The source could not be loaded; the message is best-effort.
    LoadError(Option<String>),
}

/// Audio playback backend driven by the player component.
pub trait PlaybackEngine {
    /// Start loading `source`; the result is reported on `events`. Replaces any previous
    /// source. Playback stays paused until [`PlaybackEngine::play`].
    fn load(&mut self, source: &str, events: Sender<EngineEvent>);
    fn play(&mut self);
    fn pause(&mut self);
    /// Pause and rewind to the start.
    fn stop(&mut self);
    /// Abandon the current source: cancel an in-flight load and release the output.
    fn unload(&mut self);
    /// Move to `secs`, clamped to the track.
    fn seek(&mut self, secs: f64);
    /// Current position in seconds.
    fn position(&self) -> f64;
    /// Track duration in seconds, once known.
    fn duration(&self) -> Option<f64>;
    fn set_rate(&mut self, rate: f32);
    fn rate(&self) -> f32;
}

struct SessionHandle {
    cancel: CancelToken,
    /// Dropping this ends the session and releases the output stream.
    _shutdown: Sender<()>,
}

/// [`PlaybackEngine`] backed by a CPAL output stream.
pub struct CpalEngine {
    config: EngineConfig,
    contexts: Arc<SharedContext>,
    transport: Arc<Transport>,
    session: Option<SessionHandle>,
}

impl CpalEngine {
    pub fn new(config: EngineConfig, contexts: Arc<SharedContext>) -> Self {
        Self {
            config,
            contexts,
            transport: Transport::shared(),
            session: None,
        }
    }

    fn cancel_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel.cancel();
        }
    }
}

impl PlaybackEngine for CpalEngine {
    fn load(&mut self, source: &str, events: Sender<EngineEvent>) {
        self.cancel_session();

        // Each session gets its own transport so a late, cancelled session can never
        // publish into the current one. Pause state and rate carry over.
        let transport = Transport::shared();
        transport.set_paused(self.transport.is_paused());
        transport.set_rate(self.transport.rate());
        self.transport = transport.clone();

        let cancel = CancelToken::new();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);

        let source = source.to_string();
        let config = self.config.clone();
        let contexts = self.contexts.clone();
        let cancel_for_thread = cancel.clone();

        std::thread::spawn(move || {
            tracing::info!(source = %source, "engine session started");
            let result = run_session(
                &source,
                &config,
                &contexts,
                &transport,
                &cancel_for_thread,
                &shutdown_rx,
                &events,
            );
            match result {
                Ok(()) => tracing::debug!(source = %source, "engine session ended"),
                Err(_) if cancel_for_thread.is_cancelled() => {
                    tracing::debug!(source = %source, "engine session cancelled");
                }
                Err(e) => {
                    tracing::warn!(source = %source, "engine load error: {e:#}");
                    let _ = events.send(EngineEvent::LoadError(Some(format!("{e:#}"))));
                }
            }
        });

        self.session = Some(SessionHandle {
            cancel,
            _shutdown: shutdown_tx,
        });
    }

    fn play(&mut self) {
        self.transport.set_paused(false);
    }

    fn pause(&mut self) {
        self.transport.set_paused(true);
    }

    fn stop(&mut self) {
        self.transport.set_paused(true);
        self.transport.seek_secs(0.0);
    }

    fn unload(&mut self) {
        self.cancel_session();
        self.transport.clear();
    }

    fn seek(&mut self, secs: f64) {
        self.transport.seek_secs(secs);
    }

    fn position(&self) -> f64 {
        self.transport.position_secs()
    }

    fn duration(&self) -> Option<f64> {
        self.transport.duration_secs()
    }

    fn set_rate(&mut self, rate: f32) {
        self.transport.set_rate(rate);
    }

    fn rate(&self) -> f32 {
        self.transport.rate()
    }
}

impl Drop for CpalEngine {
    fn drop(&mut self) {
        self.cancel_session();
    }
}

/// Fetch, decode, open the device and hold the stream until shutdown.
fn run_session(
    source: &str,
    config: &EngineConfig,
    contexts: &SharedContext,
    transport: &Arc<Transport>,
    cancel: &CancelToken,
    shutdown: &Receiver<()>,
    events: &Sender<EngineEvent>,
) -> Result<()> {
    let Some(bytes) = source::fetch_bytes(source, &config.fetch, cancel)? else {
        return Ok(());
    };
    let audio = {
        let ctx = contexts.acquire();
        decode::decode_all(&ctx, bytes, decode::hint_for_source(source)).context("decode source")?
    };
    if cancel.is_cancelled() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = device::pick_device(&host, config.device.as_deref())?;
    let supported = device::pick_output_config(&device, Some(audio.sample_rate))?;
    let mut stream_config: cpal::StreamConfig = supported.clone().into();
    if let Some(buf) = device::pick_buffer_size(&supported) {
        stream_config.buffer_size = buf;
    }
    let out_rate = stream_config.sample_rate;

    let samples = resample::resample_interleaved(
        &audio.samples,
        audio.channels,
        audio.sample_rate,
        out_rate,
        config.chunk_frames,
    )?;
    if cancel.is_cancelled() {
        return Ok(());
    }
    let track = Arc::new(PcmTrack::new(samples, audio.channels));
    transport.mark_loaded(track.frames() as u64, out_rate);

    let stream = playback::build_output_stream(
        &device,
        &stream_config,
        supported.sample_format(),
        track,
        transport.clone(),
    )?;
    stream.play().context("start output stream")?;

    let duration_secs = transport.duration_secs().unwrap_or(0.0);
    tracing::info!(
        source = %source,
        codec = audio.info.codec.as_deref().unwrap_or("-"),
        source_hz = audio.sample_rate,
        output_hz = out_rate,
        channels = audio.channels,
        output_format = ?supported.sample_format(),
        duration_secs,
        "engine loaded"
    );
    let _ = events.send(EngineEvent::Loaded { duration_secs });

    // Blocks until the engine drops its shutdown sender.
    let _ = shutdown.recv();
    drop(stream);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn engine() -> CpalEngine {
        CpalEngine::new(EngineConfig::default(), Arc::new(SharedContext::new()))
    }

    #[test]
    fn unloaded_engine_reports_nothing() {
        let engine = engine();
        assert_eq!(engine.position(), 0.0);
        assert_eq!(engine.duration(), None);
        assert_eq!(engine.rate(), 1.0);
    }

    #[test]
    fn missing_source_reports_load_error() {
        let mut engine = engine();
        let (tx, rx) = crossbeam_channel::unbounded();
        engine.load("/definitely/not/here.wav", tx);
        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        match event {
            EngineEvent::LoadError(Some(msg)) => assert!(msg.contains("open"), "{msg}"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn undecodable_source_reports_load_error() {
        let path = std::env::temp_dir().join(format!("wave-engine-bad-{}.wav", std::process::id()));
        std::fs::write(&path, vec![0x42u8; 256]).unwrap();
        let mut engine = engine();
        let (tx, rx) = crossbeam_channel::unbounded();
        engine.load(&path.display().to_string(), tx);
        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(matches!(event, EngineEvent::LoadError(Some(ref m)) if m.contains("decode source")));
    }

    #[test]
    fn pause_state_and_rate_survive_reload() {
        let mut engine = engine();
        engine.play();
        engine.set_rate(2.0);
        let (tx, _rx) = crossbeam_channel::unbounded();
        engine.load("/definitely/not/here.wav", tx);
        assert_eq!(engine.rate(), 2.0);
        assert!(!engine.transport.is_paused());
        engine.stop();
        assert!(engine.transport.is_paused());
        assert_eq!(engine.position(), 0.0);
    }

    #[test]
    fn seek_during_load_is_kept() {
        let mut engine = engine();
        let (tx, _rx) = crossbeam_channel::unbounded();
        engine.load("/definitely/not/here.wav", tx);
        engine.seek(12.5);
        assert_eq!(engine.position(), 12.5);
    }

    #[test]
    fn unload_cancels_session_and_forgets_track() {
        let mut engine = engine();
        let (tx, _rx) = crossbeam_channel::unbounded();
        engine.load("/definitely/not/here.wav", tx);
        let cancel = engine.session.as_ref().map(|s| s.cancel.clone()).unwrap();
        engine.seek(3.0);

        engine.unload();
        assert!(cancel.is_cancelled());
        assert!(engine.session.is_none());
        assert_eq!(engine.duration(), None);
        assert_eq!(engine.position(), 0.0);
    }
}
