//! Track list - name, instrument, level, mute

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;

pub fn render_tracks(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title(" Tracks ").borders(Borders::ALL);

    let lines: Vec<Line> = app
        .seq
        .tracks()
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let mut style = Style::default().fg(if track.muted { Color::DarkGray } else { Color::White });
            if i == app.selected {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Line::from(vec![
                Span::styled(format!("{:<9.9}", track.name), style),
                Span::styled(format!(" {:<5}", track.instrument), Style::default().fg(Color::Cyan)),
                Span::styled(format!(" {:>4.0}dB", track.volume_db), Style::default().fg(Color::DarkGray)),
                Span::styled(if track.muted { " M" } else { "  " }, Style::default().fg(Color::Red)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
