//! UI rendering module for the terminal storefront
//!
//! This module contains all the rendering logic for the terminal user interface,
//! using the ratatui library for TUI components.

pub mod cart_view;
pub mod help_overlay;
pub mod product_detail;
pub mod product_list;

use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, AppState};
use crate::catalog::DataSource;

pub use cart_view::render as render_cart;
pub use help_overlay::render as render_help_overlay;
pub use product_detail::render as render_product_detail;
pub use product_list::render as render_product_list;

/// Renders the UI based on the current application state
pub fn render(frame: &mut Frame, app: &App) {
    match &app.state {
        AppState::Loading => render_loading(frame),
        AppState::ProductList => render_product_list(frame, app),
        AppState::ProductDetail(id) => render_product_detail(frame, app, id),
        AppState::Cart => render_cart(frame, app),
    }
    if app.show_help {
        render_help_overlay(frame);
    }
}

/// Renders a loading message while the first listing is fetched
fn render_loading(frame: &mut Frame) {
    let area = frame.area();

    // Center the loading message vertically
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(3),
            Constraint::Percentage(45),
        ])
        .split(area);

    let loading_text = Paragraph::new("Loading products...")
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center);

    frame.render_widget(loading_text, chunks[1]);
}

/// Color used to flag where the data came from
pub(crate) fn source_color(source: DataSource) -> Color {
    match source {
        DataSource::Live => Color::Green,
        DataSource::Cached => Color::Cyan,
        DataSource::Stale => Color::Yellow,
        DataSource::Fallback => Color::Red,
    }
}

/// Renders the footer: progress or status message, then key hints and data freshness
pub(crate) fn render_footer(frame: &mut Frame, area: Rect, app: &App, keys: &[(&str, &str)]) {
    let status_line = if let Some(action) = app.pending {
        Line::from(Span::styled(action.progress_label(), Style::default().fg(Color::Cyan)))
    } else if let Some(status) = &app.status {
        let color = if status.is_error { Color::Yellow } else { Color::Green };
        Line::from(Span::styled(status.text.clone(), Style::default().fg(color)))
    } else {
        Line::from("")
    };

    let mut spans = Vec::new();
    for (key, label) in keys {
        spans.push(Span::styled(key.to_string(), Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(format!(" {}  ", label)));
    }
    if let Some(source) = app.source {
        spans.push(Span::styled(
            format!("│ {}", source),
            Style::default().fg(source_color(source)),
        ));
    }
    if let Some(last_refresh) = app.last_refresh {
        let mins_ago = (Local::now() - last_refresh).num_minutes();
        let freshness = if mins_ago < 1 {
            " · just now".to_string()
        } else {
            format!(" · {}m ago", mins_ago)
        };
        spans.push(Span::styled(freshness, Style::default().fg(Color::DarkGray)));
    }

    let paragraph = Paragraph::new(vec![status_line, Line::from(spans)])
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}
