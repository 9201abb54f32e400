//! Transport bar - tempo, swing, play state, position

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use agentic_sequencer::sequencing::TransportTime;

use crate::app::App;

pub fn render_transport(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title(" agentic-seq ").borders(Borders::ALL);
    let project = app.seq.project();
    let playing = app.seq.is_playing();

    let position = app
        .playhead()
        .map(TransportTime::from_step)
        .unwrap_or(TransportTime::ZERO);

    let mut spans = vec![
        Span::styled(
            format!(" BPM: {:.0}  ", project.tempo_bpm()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("Swing: {:.0}%  ", project.swing_percent()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            if playing { "▶ Playing  " } else { "■ Stopped  " },
            Style::default().fg(if playing { Color::Green } else { Color::Yellow }),
        ),
        Span::styled(format!("{position}  "), Style::default().fg(Color::White)),
        Span::styled(
            format!("{} steps / {} bars", project.total_steps(), project.loop_length_bars()),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if app.seq.is_out_of_sync() {
        spans.push(Span::styled(
            "  ● edits pending [r]",
            Style::default().fg(Color::Magenta),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
