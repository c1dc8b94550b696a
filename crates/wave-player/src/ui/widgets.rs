use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::Widget;
use wave_engine::waveform::Waveform;

use crate::player::SeekPosition;

/// Mirrored peak bars, one per column. Columns left of `progress` use `played_style`.
pub(crate) struct WaveformBars<'a> {
    waveform: &'a Waveform,
    progress: f64,
    played_style: Style,
    style: Style,
}

impl<'a> WaveformBars<'a> {
    pub(crate) fn new(waveform: &'a Waveform, progress: f64) -> Self {
        Self {
            waveform,
            progress: progress.clamp(0.0, 1.0),
            played_style: Style::default(),
            style: Style::default(),
        }
    }

    pub(crate) fn played_style(mut self, style: Style) -> Self {
        self.played_style = style;
        self
    }

    pub(crate) fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

impl Widget for WaveformBars<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() {
            return;
        }
        let columns = self.waveform.fit_width(area.width as usize);
        let played_cols = (self.progress * area.width as f64).round() as usize;
        for (i, amp) in columns.iter().enumerate() {
            let cells = bar_cells(*amp, area.height);
            let top = area.y + (area.height - cells) / 2;
            let x = area.x + i as u16;
            let style = if i < played_cols { self.played_style } else { self.style };
            for y in top..top + cells {
                if let Some(cell) = buf.cell_mut((x, y)) {
                    cell.set_symbol("█").set_style(style);
                }
            }
        }
    }
}

/// Cells a bar of amplitude `amp` covers in a region `height` rows tall (at least one).
fn bar_cells(amp: f32, height: u16) -> u16 {
    let cells = (amp.clamp(0.0, 1.0) * height as f32).round() as u16;
    cells.clamp(1, height.max(1))
}

/// Mouse click on the waveform region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct WaveformClick {
    /// Column relative to the left edge of the waveform.
    pub(crate) column: u16,
    pub(crate) width: u16,
}

impl WaveformClick {
    /// Click at absolute `column` inside `area`, if it falls inside it.
    pub(crate) fn within(area: Rect, column: u16, row: u16) -> Option<Self> {
        let inside = column >= area.x
            && column < area.x.saturating_add(area.width)
            && row >= area.y
            && row < area.y.saturating_add(area.height);
        inside.then(|| Self {
            column: column - area.x,
            width: area.width,
        })
    }
}

impl SeekPosition for WaveformClick {
    fn seek_position(&self, duration: f64) -> f64 {
        if self.width == 0 {
            return 0.0;
        }
        self.column as f64 / self.width as f64 * duration
    }
}
