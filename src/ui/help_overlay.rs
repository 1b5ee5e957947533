//! Help overlay: key bindings and what the data source labels mean

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::source_color;
use crate::catalog::DataSource;

const WIDTH: u16 = 54;

type Section = (&'static str, &'static [(&'static str, &'static str)]);

const SECTIONS: &[Section] = &[
    (
        "Browsing",
        &[
            ("↑/k ↓/j", "Move selection"),
            ("Enter", "Product details"),
            ("c", "Open the cart"),
            ("r", "Refresh products"),
            ("Esc / q", "Back / quit"),
        ],
    ),
    (
        "Cart",
        &[
            ("a", "Add selected quantity"),
            ("+ / -", "Change quantity"),
            ("d / x", "Remove line / empty cart"),
            ("v", "Check against current stock"),
            ("Enter", "Check out"),
        ],
    ),
];

const SOURCES: [(DataSource, &str, &str); 4] = [
    (DataSource::Live, "live", "fetched just now"),
    (DataSource::Cached, "cached", "saved copy, still fresh"),
    (DataSource::Stale, "stale", "store unreachable, old copy"),
    (DataSource::Fallback, "bundled", "store unreachable, browse only"),
];

/// Draws the overlay centred over whatever view is below it
pub fn render(frame: &mut Frame) {
    let lines = help_lines();
    let height = lines.len() as u16 + 2;
    let area = centered(frame.area(), WIDTH, height);

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Left).block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        ),
        area,
    );
}

fn help_lines() -> Vec<Line<'static>> {
    let heading = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();

    for (title, keys) in SECTIONS {
        lines.push(Line::from(Span::styled(*title, heading)));
        lines.extend(keys.iter().map(|(key, action)| {
            Line::from(vec![
                Span::styled(format!("  {:<10}", key), Style::default().fg(Color::Yellow)),
                Span::raw(*action),
            ])
        }));
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled("Data", heading)));
    lines.extend(SOURCES.iter().map(|(source, name, meaning)| {
        Line::from(vec![
            Span::styled(format!("  {:<10}", name), Style::default().fg(source_color(*source))),
            Span::raw(*meaning),
        ])
    }));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "? or Esc closes this help",
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

/// A `width` x `height` rect centred in `area`, shrunk to fit
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
