//! Product list screen rendering
//!
//! Shows the catalog with price and stock, a cart summary in the header and the
//! data source in the footer.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::{render_footer, source_color};
use crate::app::App;
use crate::catalog::{format_cents, DataSource, Product};

/// Stock label and its color
fn stock_label(product: &Product) -> (String, Color) {
    if !product.is_active {
        ("unavailable".to_string(), Color::DarkGray)
    } else if product.inventory == 0 {
        ("out of stock".to_string(), Color::Red)
    } else if product.inventory <= 5 {
        (format!("only {} left", product.inventory), Color::Yellow)
    } else {
        ("in stock".to_string(), Color::Green)
    }
}

/// First row to draw so that `selected` stays visible in `height` rows
fn scroll_offset(selected: usize, height: usize) -> usize {
    if height == 0 {
        return 0;
    }
    selected.saturating_sub(height - 1)
}

/// Renders the product list screen
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Header
            Constraint::Min(3),    // Product list
            Constraint::Length(2), // Status and key hints
        ])
        .split(area);

    render_header(frame, app, chunks[0]);
    render_list(frame, app, chunks[1]);
    render_footer(
        frame,
        chunks[2],
        app,
        &[
            ("↑/↓", "Navigate"),
            ("Enter", "Details"),
            ("a", "Add"),
            ("c", "Cart"),
            ("r", "Refresh"),
            ("?", "Help"),
            ("q", "Quit"),
        ],
    );
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let cart = app.cart();
    let cart_text = if cart.is_empty() {
        "Cart empty".to_string()
    } else {
        format!("Cart: {} item(s), {}", cart.item_count(), format_cents(cart.subtotal_cents()))
    };

    let mut spans = vec![
        Span::styled(
            "SHOPFRONT",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(cart_text, Style::default().fg(Color::White)),
    ];
    if app.is_offline() {
        spans.push(Span::styled("  [offline]", Style::default().fg(Color::Yellow)));
    }

    let separator = "─".repeat((area.width as usize).saturating_sub(2));
    let lines = vec![
        Line::from(spans),
        Line::from(Span::styled(separator, Style::default().fg(Color::DarkGray))),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_list(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.source {
        Some(source) if source != DataSource::Live => format!(" Products ({}) ", source),
        _ => " Products ".to_string(),
    };
    let border_color = app.source.map_or(Color::Cyan, |source| {
        if source.is_current() {
            Color::Cyan
        } else {
            source_color(source)
        }
    });
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    if app.products.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No products to show",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let visible = area.height.saturating_sub(2) as usize;
    let offset = scroll_offset(app.selected_index, visible);
    let mut lines: Vec<Line> = Vec::with_capacity(visible);

    for (index, product) in app.products.iter().enumerate().skip(offset).take(visible) {
        let is_selected = index == app.selected_index;
        let cursor = if is_selected { "\u{25B8} " } else { "  " }; // ▸ or space
        let name_style = if is_selected {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else if product.is_available() {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let (stock, stock_color) = stock_label(product);
        let in_cart = app
            .cart()
            .get(&product.id)
            .map(|item| format!("  ×{} in cart", item.quantity))
            .unwrap_or_default();

        lines.push(Line::from(vec![
            Span::styled(cursor, Style::default().fg(Color::Cyan)),
            Span::styled(format!("{:<30}", product.name), name_style),
            Span::styled(format!("{:>11}", product.display_price()), Style::default().fg(Color::White)),
            Span::raw("  "),
            Span::styled(format!("{:<13}", stock), Style::default().fg(stock_color)),
            Span::styled(format!("{:<12}", product.category), Style::default().fg(Color::DarkGray)),
            Span::styled(in_cart, Style::default().fg(Color::Green)),
        ]));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
