//! TUI layout: transport bar, track list, grid editor, status and help

mod grid;
mod tracks;
mod transport;

use std::time::Duration;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;
use crate::logger;

use grid::render_grid;
use tracks::render_tracks;
use transport::render_transport;

/// How long a warning covers the status line
const WARNING_TTL: Duration = Duration::from_secs(4);

const HELP: &str = " [Space] Play/Stop  [Arrows] Move  [Enter] Toggle  [+/-] Velocity  [r] Resync  \
[Tab] Track  [a/d] Add/Delete  [m] Mute  [i] Instrument  [,/.] Volume  [[ ]] Tempo  [{ }] Swing  \
[c] Clear  [e] Export  [s] Save  [q] Quit";

pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Transport bar
            Constraint::Min(8),    // Tracks + grid
            Constraint::Length(1), // Status
            Constraint::Length(1), // Help bar
        ])
        .split(area);

    render_transport(frame, chunks[0], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(20)])
        .split(chunks[1]);
    render_tracks(frame, body[0], app);
    render_grid(frame, body[1], app);

    // A fresh warning wins over the controller's status line
    let status = match logger::latest() {
        Some((level, message, at)) if level <= log::Level::Warn && at.elapsed() < WARNING_TTL => {
            Line::from(Span::styled(format!(" {message}"), Style::default().fg(Color::Red)))
        }
        _ => Line::from(Span::styled(
            format!(" {}", app.seq.status()),
            Style::default().fg(Color::White),
        )),
    };
    frame.render_widget(Paragraph::new(status), chunks[2]);

    let help = Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[3]);
}
