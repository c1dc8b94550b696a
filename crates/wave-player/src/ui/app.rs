use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event as CEvent, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Position, Rect},
};
use wave_engine::context::SharedContext;
use wave_engine::engine::{CpalEngine, PlaybackEngine};

use crate::clock::{Clock, SystemClock};
use crate::config::PlayerConfig;
use crate::loader::FetchingLoader;
use crate::player::WaveformPlayer;
use crate::state::DisplayMode;

use super::render;
use super::widgets::WaveformClick;

/// Seconds moved by the arrow keys.
const SEEK_STEP_SECS: f64 = 5.0;
const LOG_CAP: usize = 500;

/// Build the player for `source`, mount it and drive the terminal until quit.
pub fn run_tui(source: String, config: PlayerConfig, log_rx: Receiver<String>) -> Result<()> {
    let contexts = Arc::new(SharedContext::new());
    let engine = CpalEngine::new(config.engine.clone(), contexts.clone());
    let loader = FetchingLoader::new(contexts, config.engine.fetch.clone(), config.scale);

    let mut player = WaveformPlayer::new(source, engine, SystemClock, config.player_options());
    player.mount(&loader);
    let mut app = App::new(player, log_rx);

    let mut term = init_terminal()?;
    let result = ui_loop(&mut term, &mut app);

    restore_terminal(&mut term)?;
    app.player.teardown();
    result
}

/// Screen regions that react to mouse clicks, as of the last draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct HitAreas {
    pub(crate) play: Rect,
    pub(crate) speed: Rect,
    pub(crate) waveform: Rect,
}

/// In-memory UI state for rendering + interaction.
pub(crate) struct App<E: PlaybackEngine, C: Clock> {
    pub(crate) player: WaveformPlayer<E, C>,
    /// Draw counter, drives the loading spinner.
    pub(crate) frame: u64,
    pub(crate) logs_open: bool,
    pub(crate) logs: VecDeque<String>,
    pub(crate) logs_scroll: usize,
    pub(crate) hit: HitAreas,
    log_rx: Receiver<String>,
    quit: bool,
}

impl<E: PlaybackEngine, C: Clock> App<E, C> {
    pub(crate) fn new(player: WaveformPlayer<E, C>, log_rx: Receiver<String>) -> Self {
        Self {
            player,
            frame: 0,
            logs_open: false,
            logs: VecDeque::new(),
            logs_scroll: 0,
            hit: HitAreas::default(),
            log_rx,
            quit: false,
        }
    }

    pub(crate) fn should_quit(&self) -> bool {
        self.quit
    }

    fn controls_visible(&self) -> bool {
        self.player.state().display_mode() == DisplayMode::Controls
    }

    fn toggle_logs(&mut self) {
        self.logs_open = !self.logs_open;
        if !self.logs_open {
            self.logs_scroll = 0;
        }
    }

    fn scroll_logs_up(&mut self) {
        let max = self.logs.len().saturating_sub(1);
        self.logs_scroll = (self.logs_scroll + 1).min(max);
    }

    fn scroll_logs_down(&mut self) {
        self.logs_scroll = self.logs_scroll.saturating_sub(1);
    }

    fn push_log_line(&mut self, line: String) {
        if self.logs.len() >= LOG_CAP {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    fn drain_logs(&mut self) {
        while let Ok(line) = self.log_rx.try_recv() {
            self.push_log_line(line);
        }
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit = true;
            return;
        }
        if self.logs_open {
            match key.code {
                KeyCode::Char('q') => self.quit = true,
                KeyCode::Esc | KeyCode::Char('l') => self.toggle_logs(),
                KeyCode::Up => self.scroll_logs_up(),
                KeyCode::Down => self.scroll_logs_down(),
                _ => {}
            }
            return;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char('l') => self.toggle_logs(),
            _ if !self.controls_visible() => {}
            KeyCode::Char(' ') | KeyCode::Char('p') => self.player.handle_play(),
            KeyCode::Char('s') => self.player.toggle_rate(),
            KeyCode::Left => self.player.seek_by(-SEEK_STEP_SECS),
            KeyCode::Right => self.player.seek_by(SEEK_STEP_SECS),
            KeyCode::Home => self.player.seek(0.0),
            _ => {}
        }
    }

    /// Left click at terminal cell (`column`, `row`).
    pub(crate) fn handle_click(&mut self, column: u16, row: u16) {
        if self.logs_open || !self.controls_visible() {
            return;
        }
        let at = Position::new(column, row);
        if self.hit.play.contains(at) {
            self.player.handle_play();
        } else if self.hit.speed.contains(at) {
            self.player.toggle_rate();
        } else if let Some(click) = WaveformClick::within(self.hit.waveform, column, row) {
            self.player.handle_click(&click);
        }
    }
}

fn ui_loop<E: PlaybackEngine, C: Clock>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<E, C>,
) -> Result<()> {
    let tick = Duration::from_millis(33);

    loop {
        app.player.pump();
        app.player.run_due_timers();
        app.drain_logs();

        app.frame = app.frame.wrapping_add(1);
        terminal.draw(|f| render::draw(f, app))?;

        let timeout = app.player.next_timer_in().map_or(tick, |due| due.min(tick));
        if event::poll(timeout).context("poll terminal events")? {
            match event::read().context("read terminal event")? {
                CEvent::Key(k) => app.handle_key(k),
                CEvent::Mouse(m) if m.kind == MouseEventKind::Down(MouseButton::Left) => {
                    app.handle_click(m.column, m.row);
                }
                _ => {}
            }
        }

        if app.should_quit() {
            return Ok(());
        }
    }
}

fn init_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture).context("enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("create terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    Ok(())
}
