//! Cart screen rendering
//!
//! Lists cart lines with totals, the issues found by the last inventory check
//! and, after a successful checkout, the payment link.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::render_footer;
use crate::app::App;
use crate::catalog::format_cents;

/// Renders the cart screen
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let notes = notes_height(app);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(4),        // Cart lines
            Constraint::Length(notes), // Issues and payment link
            Constraint::Length(2),     // Status and key hints
        ])
        .split(area);

    render_lines(frame, app, chunks[0]);
    if notes > 0 {
        render_notes(frame, app, chunks[1]);
    }
    render_footer(
        frame,
        chunks[2],
        app,
        &[
            ("+/-", "Qty"),
            ("d", "Remove"),
            ("x", "Empty"),
            ("v", "Check stock"),
            ("Enter", "Checkout"),
            ("Esc", "Back"),
        ],
    );
}

fn notes_height(app: &App) -> u16 {
    let issues = app.last_validation.as_ref().map_or(0, |v| v.issues.len());
    let link = usize::from(app.checkout_url.is_some()) * 2;
    match issues + link {
        0 => 0,
        n => (n as u16).saturating_add(2).min(10),
    }
}

fn render_lines(frame: &mut Frame, app: &App, area: Rect) {
    let cart = app.cart();
    let block = Block::default()
        .title(" Cart ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if cart.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "Your cart is empty. Press Esc to browse products.",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let mut lines = Vec::with_capacity(cart.items.len() + 2);
    for (index, item) in cart.items.iter().enumerate() {
        let is_selected = index == app.cart_index;
        let cursor = if is_selected { "\u{25B8} " } else { "  " };
        let name_style = if is_selected {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(vec![
            Span::styled(cursor, Style::default().fg(Color::Cyan)),
            Span::styled(format!("{:>3} × ", item.quantity), Style::default().fg(Color::Yellow)),
            Span::styled(format!("{:<30}", item.name), name_style),
            Span::raw(format!("{:>11}", format_cents(item.unit_price_cents))),
            Span::styled(
                format!("{:>12}", format_cents(item.line_total_cents())),
                Style::default().fg(Color::White),
            ),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled(
            format!("  Subtotal ({} items) ", cart.item_count()),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format_cents(cart.subtotal_cents()),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
    ]));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_notes(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();
    if let Some(validation) = &app.last_validation {
        for issue in &validation.issues {
            lines.push(Line::from(vec![
                Span::styled("! ", Style::default().fg(Color::Yellow)),
                Span::raw(issue.to_string()),
            ]));
        }
    }
    if let Some(url) = &app.checkout_url {
        lines.push(Line::from(Span::styled(
            "Complete payment at:",
            Style::default().fg(Color::Green),
        )));
        lines.push(Line::from(Span::styled(
            url.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}
