//! Product detail screen rendering

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::render_footer;
use crate::app::App;
use crate::catalog::format_cents;

/// Renders the detail view for the product with `product_id`
pub fn render(frame: &mut Frame, app: &App, product_id: &str) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(2)])
        .split(area);

    let Some(product) = app.product(product_id) else {
        let missing = Paragraph::new(format!("Product '{}' is no longer listed", product_id))
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(missing, chunks[0]);
        render_footer(frame, chunks[1], app, &[("Esc", "Back"), ("q", "Quit")]);
        return;
    };

    let label = Style::default().fg(Color::DarkGray);
    let stock = match (product.is_active, product.inventory) {
        (false, _) => Span::styled("No longer sold", Style::default().fg(Color::DarkGray)),
        (true, 0) => Span::styled("Out of stock", Style::default().fg(Color::Red)),
        (true, n) => Span::styled(format!("{} in stock", n), Style::default().fg(Color::Green)),
    };

    let mut lines = vec![
        Line::from(Span::styled(
            product.name.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Price     ", label),
            Span::styled(product.display_price(), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![Span::styled("Stock     ", label), stock]),
        Line::from(vec![
            Span::styled("Category  ", label),
            Span::raw(product.category.clone()),
        ]),
    ];
    if let Some(item) = app.cart().get(&product.id) {
        lines.push(Line::from(vec![
            Span::styled("In cart   ", label),
            Span::styled(
                format!("{} ({})", item.quantity, format_cents(item.line_total_cents())),
                Style::default().fg(Color::Green),
            ),
        ]));
    }
    if !product.description.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(product.description.clone()));
    }

    if product.is_available() {
        let total = product.price_cents.saturating_mul(u64::from(app.quantity));
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Quantity  ", label),
            Span::styled(
                format!("◂ {} ▸", app.quantity),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  = {}", format_cents(total)), Style::default().fg(Color::White)),
        ]));
    }

    let block = Block::default()
        .title(format!(" {} ", product.id))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, chunks[0]);

    render_footer(
        frame,
        chunks[1],
        app,
        &[
            ("+/-", "Quantity"),
            ("a", "Add to cart"),
            ("c", "Cart"),
            ("Esc", "Back"),
            ("q", "Quit"),
        ],
    );
}

#[cfg(test)]
mod tests {
    use crate::app::tests::create_test_app;
    use crate::app::AppState;
    use crate::ui::tests::render_to_string;
    use tempfile::TempDir;

    #[test]
    fn test_render_detail() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);
        app.state = AppState::ProductDetail("tee".to_string());
        app.quantity = 3;

        let content = render_to_string(&app);

        assert!(content.contains("Product tee"));
        assert!(content.contains("10 in stock"));
        assert!(content.contains("◂ 3 ▸"));
        assert!(content.contains("= $75.00"));
    }

    #[test]
    fn test_out_of_stock_hides_quantity() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);
        app.state = AppState::ProductDetail("pin".to_string());

        let content = render_to_string(&app);

        assert!(content.contains("Out of stock"));
        assert!(!content.contains("◂"));
    }

    #[test]
    fn test_missing_product() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = create_test_app(&temp_dir);
        app.state = AppState::ProductDetail("gone".to_string());

        assert!(render_to_string(&app).contains("Product 'gone' is no longer listed"));
    }
}
