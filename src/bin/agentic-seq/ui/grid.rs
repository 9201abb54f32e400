//! Grid editor - one row per pitch, one column per step

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use agentic_sequencer::sequencing::{pattern::velocity_to_display, Cell, STEPS_PER_BEAT};

use crate::app::App;

const LABEL_WIDTH: usize = 5;

pub fn render_grid(frame: &mut Frame, area: Rect, app: &App) {
    let Some(track) = app.selected_track() else {
        let empty = Paragraph::new(" No tracks. Press [a] to add one.")
            .block(Block::default().title(" Grid ").borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };

    let block = Block::default()
        .title(format!(" {} ", track.name))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let pattern = &track.pattern;
    let playhead = app.playhead();
    // Scroll so the cursor stays visible
    let visible = (inner.width as usize).saturating_sub(LABEL_WIDTH).max(1);
    let first = (app.cursor_step / visible) * visible;
    let last = (first + visible).min(pattern.steps());

    let mut lines = Vec::with_capacity(pattern.rows() + 1);
    for (row, pitch) in pattern.pitches().iter().enumerate() {
        let label_style = if app.is_flashing(pitch) {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let mut spans = vec![Span::styled(format!("{pitch:<width$}", width = LABEL_WIDTH), label_style)];

        if let Some(cells) = pattern.row(row) {
            for (step, cell) in cells.iter().enumerate().take(last).skip(first) {
                let cursor = row == app.cursor_row && step == app.cursor_step;
                spans.push(cell_span(cell, step, cursor, playhead == Some(step)));
            }
        }
        lines.push(Line::from(spans));
    }

    // Velocity readout for the cell under the cursor
    if let Ok(cell) = pattern.cell(app.cursor_row, app.cursor_step) {
        lines.push(Line::from(Span::styled(
            format!(
                "{:width$}step {} vel {}",
                "",
                app.cursor_step + 1,
                velocity_to_display(cell.velocity),
                width = LABEL_WIDTH
            ),
            Style::default().fg(Color::DarkGray),
        )));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

fn cell_span(cell: &Cell, step: usize, cursor: bool, playhead: bool) -> Span<'static> {
    let glyph = if cell.active {
        match velocity_to_display(cell.velocity) {
            0..=42 => "░",
            43..=85 => "▒",
            _ => "█",
        }
    } else if step % STEPS_PER_BEAT == 0 {
        "┆"
    } else {
        "·"
    };

    let mut style = Style::default().fg(if cell.active { Color::Cyan } else { Color::DarkGray });
    if playhead {
        style = style.bg(Color::Rgb(40, 40, 60));
    }
    if cursor {
        style = style.fg(Color::Black).bg(Color::Yellow);
    }
    Span::styled(glyph, style)
}
