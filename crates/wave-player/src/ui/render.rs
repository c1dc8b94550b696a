use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use wave_engine::engine::PlaybackEngine;

use crate::clock::Clock;

use super::app::{App, HitAreas};
use super::view_model::{BodyView, LogsView, UiView, WaveformView};
use super::widgets::WaveformBars;

pub(crate) fn draw<E: PlaybackEngine, C: Clock>(f: &mut Frame, app: &mut App<E, C>) {
    let hit = {
        let view = UiView::from_app(app);
        draw_view(f, &view)
    };
    app.hit = hit;
}

fn draw_view(f: &mut Frame, view: &UiView<'_>) -> HitAreas {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(7), Constraint::Length(3)])
        .split(f.area());

    let header = Paragraph::new(
        view.header_lines
            .iter()
            .map(|l| Line::from(l.as_str()))
            .collect::<Vec<_>>(),
    )
    .block(Block::default().borders(Borders::ALL).title("Wave Player"));
    f.render_widget(header, chunks[0]);

    let body_block = Block::default().borders(Borders::ALL).title("Player");
    let body_inner = body_block.inner(chunks[1]);
    f.render_widget(body_block, chunks[1]);
    let hit = draw_body(f, body_inner, &view.body);

    f.render_widget(
        Paragraph::new(Line::from(view.keys_line.as_str()))
            .block(Block::default().borders(Borders::ALL).title("Keys")),
        chunks[2],
    );

    if let Some(logs) = view.logs.as_ref() {
        draw_logs(f, logs);
    }
    hit
}

fn draw_body(f: &mut Frame, area: Rect, body: &BodyView<'_>) -> HitAreas {
    match body {
        BodyView::LoadError(text) => {
            f.render_widget(
                Paragraph::new(text.as_str())
                    .style(Style::default().fg(Color::Red))
                    .wrap(Wrap { trim: true }),
                area,
            );
            HitAreas::default()
        }
        BodyView::Loading { label, note } => {
            let mut lines = vec![Line::from(label.as_str())];
            if let Some(note) = note {
                lines.push(Line::from(""));
                lines.push(Line::styled(note.as_str(), Style::default().fg(Color::Yellow)));
            }
            f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
            HitAreas::default()
        }
        BodyView::Controls {
            play_label,
            speed_label,
            speed_active,
            timer,
            waveform,
        } => {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Min(1)])
                .split(area);

            let play_text = format!("[ {play_label} ]");
            let speed_text = format!("[ {speed_label} ]");
            let play_w = Line::from(play_text.as_str()).width() as u16;
            let speed_w = Line::from(speed_text.as_str()).width() as u16;
            let controls = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Length(play_w),
                    Constraint::Length(1),
                    Constraint::Length(speed_w),
                    Constraint::Min(0),
                ])
                .split(rows[0]);

            let button = Style::default().add_modifier(Modifier::BOLD);
            f.render_widget(Paragraph::new(play_text).style(button), controls[0]);
            let speed_style = if *speed_active {
                button.fg(Color::Yellow)
            } else {
                Style::default()
            };
            f.render_widget(Paragraph::new(speed_text).style(speed_style), controls[2]);
            f.render_widget(
                Paragraph::new(timer.as_str()).alignment(Alignment::Right),
                controls[3],
            );

            let wave_area = rows[2];
            let waveform_hit = match waveform {
                WaveformView::Bars { waveform, progress } => {
                    f.render_widget(
                        WaveformBars::new(waveform, *progress)
                            .played_style(Style::default().fg(Color::Cyan))
                            .style(Style::default().fg(Color::DarkGray)),
                        wave_area,
                    );
                    wave_area
                }
                WaveformView::Pending => {
                    f.render_widget(
                        Paragraph::new("Decoding waveform...").style(Style::default().fg(Color::DarkGray)),
                        wave_area,
                    );
                    Rect::default()
                }
                WaveformView::Unavailable(text) => {
                    f.render_widget(
                        Paragraph::new(text.as_str())
                            .style(Style::default().fg(Color::Yellow))
                            .wrap(Wrap { trim: true }),
                        wave_area,
                    );
                    Rect::default()
                }
            };

            HitAreas {
                play: controls[0],
                speed: controls[2],
                waveform: waveform_hit,
            }
        }
    }
}

fn draw_logs(f: &mut Frame, logs: &LogsView) {
    let area = centered_rect(90, 80, f.area());
    f.render_widget(Clear, area);
    let block = Block::default().borders(Borders::ALL).title(logs.title.as_str());
    let height = block.inner(area).height as usize;
    let total = logs.lines.len();
    let end = total.saturating_sub(logs.scroll);
    let start = end.saturating_sub(height);
    let mut items: Vec<ListItem> = logs.lines[start..end]
        .iter()
        .map(|line| ListItem::new(line.as_str()))
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("<no logs>"));
    }
    f.render_widget(List::new(items).block(block), area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
