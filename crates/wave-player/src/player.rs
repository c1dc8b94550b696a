//! The waveform player component.
//!
//! [`WaveformPlayer`] owns the [`PlaybackState`], the engine and the polling timer. It lives
//! on the UI thread; background work (engine session, waveform load) reports back over
//! channels that [`WaveformPlayer::pump`] drains. The UI loop drives it like this:
//!
//! ```text
//! loop {
//!     player.pump();
//!     player.run_due_timers();
//!     draw(player.state());
//!     wait for input, at most player.next_timer_in()
//! }
//! ```

use std::time::Duration;

use crossbeam_channel::{Receiver, TryRecvError};
use wave_engine::engine::{EngineEvent, PlaybackEngine};
use wave_engine::source::CancelToken;
use wave_engine::transport::NORMAL_RATE;

use crate::clock::Clock;
use crate::error::STARTUP_ERROR;
use crate::loader::{LoaderEvent, WaveformLoader};
use crate::poll::{DEFAULT_POLL_INTERVAL, PollTimer};
use crate::state::PlaybackState;

/// Rate applied while speedup is on.
pub const DEFAULT_SPEEDUP_RATE: f32 = 2.0;

/// Tunables for one player instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerOptions {
    pub poll_interval: Duration,
    pub speedup_rate: f32,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            speedup_rate: DEFAULT_SPEEDUP_RATE,
        }
    }
}

/// Anything that can name a seek target given the track duration.
pub trait SeekPosition {
    fn seek_position(&self, duration: f64) -> f64;
}

/// A raw position in seconds.
impl SeekPosition for f64 {
    fn seek_position(&self, _duration: f64) -> f64 {
        *self
    }
}

pub struct WaveformPlayer<E: PlaybackEngine, C: Clock> {
    source: String,
    engine: E,
    clock: C,
    options: PlayerOptions,
    state: PlaybackState,
    timer: PollTimer,
    /// Set once the end-of-track stop was issued; cleared by play and seek.
    ended: bool,
    cancel: Option<CancelToken>,
    engine_rx: Receiver<EngineEvent>,
    loader_rx: Receiver<LoaderEvent>,
    mounted: bool,
}

impl<E: PlaybackEngine, C: Clock> WaveformPlayer<E, C> {
    pub fn new(source: impl Into<String>, engine: E, clock: C, options: PlayerOptions) -> Self {
        Self {
            source: source.into(),
            engine,
            clock,
            timer: PollTimer::new(options.poll_interval),
            options,
            state: PlaybackState::default(),
            ended: false,
            cancel: None,
            engine_rx: crossbeam_channel::never(),
            loader_rx: crossbeam_channel::never(),
            mounted: false,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_polling(&self) -> bool {
        self.timer.is_polling()
    }

    /// Start the waveform load and the engine load. A second mount is ignored.
    pub fn mount(&mut self, loader: &dyn WaveformLoader) {
        if self.mounted {
            return;
        }
        tracing::info!(source = %self.source, "mounting player");
        let cancel = CancelToken::new();

        let (loader_tx, loader_rx) = crossbeam_channel::unbounded();
        self.loader_rx = loader_rx;
        loader.spawn(&self.source, cancel.clone(), loader_tx);

        let (engine_tx, engine_rx) = crossbeam_channel::unbounded();
        self.engine_rx = engine_rx;
        self.engine.set_rate(self.rate());
        self.engine.load(&self.source, engine_tx);

        self.cancel = Some(cancel);
        self.mounted = true;
    }

    /// Apply every pending engine and loader event. Returns true if anything arrived.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.engine_rx.try_recv() {
                Ok(event) => {
                    self.on_engine_event(event);
                    changed = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.engine_rx = crossbeam_channel::never();
                    break;
                }
            }
        }
        loop {
            match self.loader_rx.try_recv() {
                Ok(event) => {
                    self.on_loader_event(event);
                    changed = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.loader_rx = crossbeam_channel::never();
                    break;
                }
            }
        }
        changed
    }

    /// Run the poll tick if it is due. Returns true when it ran.
    pub fn run_due_timers(&mut self) -> bool {
        if !self.timer.fire(self.clock.now()) {
            return false;
        }
        self.tick();
        true
    }

    /// Time until the poll tick is due; `None` while idle.
    pub fn next_timer_in(&self) -> Option<Duration> {
        self.timer.time_until(self.clock.now())
    }

    fn on_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Loaded { duration_secs } => {
                tracing::info!(source = %self.source, duration_secs, "playback ready");
                self.state.load_error = None;
                self.record_duration(Some(duration_secs));
                self.start_polling();
            }
            EngineEvent::LoadError(message) => {
                let message = message.unwrap_or_else(|| STARTUP_ERROR.to_string());
                tracing::warn!(source = %self.source, error = %message, "playback load error");
                self.state.load_error = Some(message);
            }
        }
    }

    fn on_loader_event(&mut self, event: LoaderEvent) {
        match event {
            LoaderEvent::Ready(waveform) => {
                tracing::info!(
                    source = %self.source,
                    peaks = waveform.len(),
                    duration_secs = waveform.duration(),
                    "waveform ready"
                );
                self.record_duration(Some(waveform.duration()));
                self.state.waveform = Some(waveform);
                self.state.waveform_error = None;
                self.start_polling();
            }
            LoaderEvent::Failed(err) => {
                tracing::error!(source = %self.source, kind = err.kind(), "waveform unavailable: {err}");
                self.state.waveform_error = Some(err);
            }
        }
    }

    /// Keep the first known duration.
    fn record_duration(&mut self, duration: Option<f64>) {
        if self.state.duration.is_some() {
            return;
        }
        if let Some(d) = duration.filter(|d| d.is_finite() && *d > 0.0) {
            self.state.duration = Some(d);
        }
    }

    fn start_polling(&mut self) {
        if !self.mounted {
            return;
        }
        self.timer.start(self.clock.now());
    }

    /// One polling pass: sync position and duration from the engine.
    fn tick(&mut self) {
        let position = self.engine.position();
        let engine_duration = self.engine.duration();
        self.record_duration(engine_duration);
        if engine_duration.is_some() {
            self.state.load_error = None;
        }

        let Some(duration) = self.state.duration else {
            self.state.current_time = self.state.clamp_time(position);
            return;
        };
        // The engine track can be a few frames shorter than the decoded waveform.
        let end = engine_duration.map_or(duration, |d| d.min(duration));
        if position >= end {
            if !self.ended {
                tracing::debug!(source = %self.source, position, "end of track");
                self.engine.stop();
                self.state.playing = false;
                self.ended = true;
            }
            self.state.current_time = 0.0;
        } else {
            self.state.current_time = self.state.clamp_time(position);
        }
    }

    /// Current engine rate for the speedup flag.
    pub fn rate(&self) -> f32 {
        if self.state.speedup {
            self.options.speedup_rate
        } else {
            NORMAL_RATE
        }
    }

    /// Play/pause control.
    pub fn handle_play(&mut self) {
        if self.state.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn play(&mut self) {
        self.state.playing = true;
        self.ended = false;
        self.engine.play();
    }

    pub fn pause(&mut self) {
        self.state.playing = false;
        self.engine.pause();
    }

    pub fn toggle_rate(&mut self) {
        self.state.speedup = !self.state.speedup;
        let rate = self.rate();
        self.engine.set_rate(rate);
        tracing::debug!(rate, "playback rate");
    }

    /// Waveform click: show the target immediately, then seek the engine.
    pub fn handle_click(&mut self, target: &impl SeekPosition) {
        let Some(duration) = self.state.duration else {
            return;
        };
        self.seek(target.seek_position(duration));
    }

    /// Seek to `target`; playback resumes there when already playing.
    pub fn seek(&mut self, target: impl SeekPosition) {
        let duration = self.state.duration.unwrap_or(0.0);
        let position = self.state.clamp_time(target.seek_position(duration));
        self.state.current_time = position;
        self.ended = false;
        self.engine.seek(position);
        if self.state.playing {
            self.engine.play();
        }
    }

    /// Seek relative to the displayed position.
    pub fn seek_by(&mut self, delta_secs: f64) {
        self.seek(self.state.current_time + delta_secs);
    }

    /// Cancel both fetches, stop polling, drop late results and unload the engine.
    pub fn teardown(&mut self) {
        if !self.mounted {
            return;
        }
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.timer.stop();
        self.engine_rx = crossbeam_channel::never();
        self.loader_rx = crossbeam_channel::never();
        self.engine.stop();
        self.engine.unload();
        self.state.playing = false;
        self.mounted = false;
        tracing::info!(source = %self.source, "player torn down");
    }
}

impl<E: PlaybackEngine, C: Clock> Drop for WaveformPlayer<E, C> {
    fn drop(&mut self) {
        self.teardown();
    }
}
