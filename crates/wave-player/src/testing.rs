//! Test doubles for the engine and the waveform loader.

use std::cell::RefCell;
use std::rc::Rc;

use crossbeam_channel::Sender;
use wave_engine::engine::{EngineEvent, PlaybackEngine};
use wave_engine::source::CancelToken;

use crate::loader::{LoaderEvent, WaveformLoader};

#[derive(Debug, Default)]
pub(crate) struct MockEngineState {
    pub(crate) source: Option<String>,
    pub(crate) events: Option<Sender<EngineEvent>>,
    /// Sent from `load` when set.
    pub(crate) on_load: Option<EngineEvent>,
    pub(crate) playing: bool,
    pub(crate) position: f64,
    pub(crate) duration: Option<f64>,
    pub(crate) rate: f32,
    pub(crate) seeks: Vec<f64>,
    /// Seek requested before the load finished.
    pub(crate) pending_seek: Option<f64>,
    pub(crate) stops: usize,
    pub(crate) unloads: usize,
}

/// Engine whose state the test owns. `stop` does not rewind. Until a duration is known,
/// seeks are parked and applied by [`MockEngine::finish_load`], like `CpalEngine`.
#[derive(Clone, Debug)]
pub(crate) struct MockEngine {
    pub(crate) state: Rc<RefCell<MockEngineState>>,
}

impl MockEngine {
    pub(crate) fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MockEngineState {
                rate: 1.0,
                ..Default::default()
            })),
        }
    }

    pub(crate) fn loading(event: EngineEvent) -> Self {
        let engine = Self::new();
        if let EngineEvent::Loaded { duration_secs } = &event {
            engine.state.borrow_mut().duration = Some(*duration_secs);
        }
        engine.state.borrow_mut().on_load = Some(event);
        engine
    }

    /// Complete a load started without an `on_load` event.
    pub(crate) fn finish_load(&self, duration_secs: f64) {
        {
            let mut state = self.state.borrow_mut();
            state.duration = Some(duration_secs);
            state.position = state
                .pending_seek
                .take()
                .map_or(0.0, |secs| secs.clamp(0.0, duration_secs));
        }
        self.emit(EngineEvent::Loaded { duration_secs });
    }

    pub(crate) fn set_position(&self, secs: f64) {
        self.state.borrow_mut().position = secs;
    }

    /// Send an event on the channel handed to `load`.
    pub(crate) fn emit(&self, event: EngineEvent) {
        if let Some(tx) = self.state.borrow().events.as_ref() {
            let _ = tx.send(event);
        }
    }
}

impl PlaybackEngine for MockEngine {
    fn load(&mut self, source: &str, events: Sender<EngineEvent>) {
        let mut state = self.state.borrow_mut();
        state.source = Some(source.to_string());
        if let Some(event) = state.on_load.take() {
            let _ = events.send(event);
        }
        state.events = Some(events);
    }

    fn play(&mut self) {
        self.state.borrow_mut().playing = true;
    }

    fn pause(&mut self) {
        self.state.borrow_mut().playing = false;
    }

    fn stop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.playing = false;
        state.stops += 1;
    }

    fn unload(&mut self) {
        let mut state = self.state.borrow_mut();
        state.unloads += 1;
        state.duration = None;
        state.pending_seek = None;
        state.position = 0.0;
    }

    fn seek(&mut self, secs: f64) {
        let mut state = self.state.borrow_mut();
        if state.duration.is_some() {
            state.position = secs;
        } else {
            state.pending_seek = Some(secs);
        }
        state.seeks.push(secs);
    }

    fn position(&self) -> f64 {
        let state = self.state.borrow();
        match (state.duration, state.pending_seek) {
            (None, Some(secs)) => secs,
            _ => state.position,
        }
    }

    fn duration(&self) -> Option<f64> {
        self.state.borrow().duration
    }

    fn set_rate(&mut self, rate: f32) {
        self.state.borrow_mut().rate = rate;
    }

    fn rate(&self) -> f32 {
        self.state.borrow().rate
    }
}

/// Loader that answers synchronously and keeps the cancel token it was given.
#[derive(Default)]
pub(crate) struct StubLoader {
    pub(crate) outcome: Option<LoaderEvent>,
    pub(crate) cancel: RefCell<Option<CancelToken>>,
}

impl StubLoader {
    pub(crate) fn answering(outcome: LoaderEvent) -> Self {
        Self {
            outcome: Some(outcome),
            cancel: RefCell::new(None),
        }
    }

    pub(crate) fn pending() -> Self {
        Self::default()
    }

    pub(crate) fn was_cancelled(&self) -> bool {
        self.cancel
            .borrow()
            .as_ref()
            .map(|c| c.is_cancelled())
            .unwrap_or(false)
    }
}

impl WaveformLoader for StubLoader {
    fn spawn(&self, _source: &str, cancel: CancelToken, events: Sender<LoaderEvent>) {
        if let Some(outcome) = self.outcome.clone() {
            let _ = events.send(outcome);
        }
        *self.cancel.borrow_mut() = Some(cancel);
    }
}
