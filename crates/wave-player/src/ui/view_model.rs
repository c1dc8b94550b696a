//! UI view-models for the TUI.
//!
//! This module converts `App` state into render-ready strings and flags so `render.rs`
//! stays layout-focused.

use wave_engine::engine::PlaybackEngine;
use wave_engine::waveform::Waveform;

use crate::clock::Clock;
use crate::state::{DisplayMode, PlaybackState};
use crate::ui::app::App;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

pub(crate) struct UiView<'a> {
    pub(crate) header_lines: Vec<String>,
    pub(crate) body: BodyView<'a>,
    pub(crate) keys_line: String,
    pub(crate) logs: Option<LogsView>,
}

pub(crate) enum BodyView<'a> {
    LoadError(String),
    Loading {
        label: String,
        note: Option<String>,
    },
    Controls {
        play_label: String,
        speed_label: String,
        speed_active: bool,
        timer: String,
        waveform: WaveformView<'a>,
    },
}

pub(crate) enum WaveformView<'a> {
    Bars { waveform: &'a Waveform, progress: f64 },
    Pending,
    Unavailable(String),
}

pub(crate) struct LogsView {
    pub(crate) title: String,
    pub(crate) lines: Vec<String>,
    /// Lines scrolled up from the bottom.
    pub(crate) scroll: usize,
}

impl<'a> UiView<'a> {
    pub(crate) fn from_app<E: PlaybackEngine, C: Clock>(app: &'a App<E, C>) -> Self {
        let state = app.player.state();
        let header_lines = vec![format!("source: {}", app.player.source())];
        Self {
            header_lines,
            body: build_body(state, app.player.rate(), app.frame),
            keys_line: "keys: Space play/pause | s speed | ←/→ seek | Home start | l logs | q quit"
                .to_string(),
            logs: app.logs_open.then(|| build_logs_view(app)),
        }
    }
}

fn build_body(state: &PlaybackState, rate: f32, frame: u64) -> BodyView<'_> {
    match state.display_mode() {
        DisplayMode::LoadError => BodyView::LoadError(format!(
            "Unable to load audio: {}",
            state.load_error.as_deref().unwrap_or_default()
        )),
        DisplayMode::Loading => BodyView::Loading {
            label: format!("Loading {}", SPINNER[((frame / 8) % SPINNER.len() as u64) as usize]),
            note: state
                .waveform_error
                .as_ref()
                .map(|e| format!("Waveform unavailable: {e}")),
        },
        DisplayMode::Controls => {
            let waveform = match (&state.waveform, &state.waveform_error) {
                (Some(waveform), _) => WaveformView::Bars {
                    waveform,
                    progress: state.progress(),
                },
                (None, Some(err)) => WaveformView::Unavailable(format!("Waveform unavailable: {err}")),
                (None, None) => WaveformView::Pending,
            };
            BodyView::Controls {
                play_label: if state.playing { "❚❚ Pause" } else { "▶ Play" }.to_string(),
                speed_label: format!("{} {rate:.1}x", if state.speedup { "»" } else { "›" }),
                speed_active: state.speedup,
                timer: format_timer(state.current_time, state.duration.unwrap_or(0.0)),
                waveform,
            }
        }
    }
}

fn build_logs_view<E: PlaybackEngine, C: Clock>(app: &App<E, C>) -> LogsView {
    LogsView {
        title: "Logs (Esc to close, ↑/↓ scroll)".to_string(),
        lines: app.logs.iter().cloned().collect(),
        scroll: app.logs_scroll,
    }
}

pub(crate) fn format_timer(current_secs: f64, duration_secs: f64) -> String {
    format!(
        "{} / {}",
        format_duration_ms(secs_to_ms(current_secs)),
        format_duration_ms(secs_to_ms(duration_secs))
    )
}

fn secs_to_ms(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1000.0) as u64
    } else {
        0
    }
}

pub(crate) fn format_duration_ms(ms: u64) -> String {
    let total_secs = ms / 1000;
    let mins = total_secs / 60;
    let secs = total_secs % 60;
    format!("{mins}:{secs:02}")
}
