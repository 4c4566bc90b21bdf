use crate::core::currency::{Currency, Direction};
use crate::engine::RowStatus;
use chrono::{DateTime, Utc};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Label,
    Error,
    Warning,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Label => style(text).bold(),
        StyleType::Error => style(text).red(),
        StyleType::Warning => style(text).yellow(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Formats an `Option<T>` into a `Cell`. `None` is displayed as "N/A".
pub fn format_optional_cell<T>(value: Option<T>, format_fn: impl Fn(T) -> String) -> Cell {
    value.map_or(
        Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
        |v| Cell::new(format_fn(v)).set_alignment(CellAlignment::Right),
    )
}

pub fn direction_arrow(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "▲",
        Direction::Down => "▼",
        Direction::Flat => "•",
    }
}

/// "▲ +1.0000 (+1.12%)", or `None` without a previous value.
pub fn change_text(currency: &Currency) -> Option<String> {
    let change = currency.change()?;
    let arrow = direction_arrow(currency.direction());
    Some(match currency.change_percent() {
        Some(percent) => format!("{arrow} {change:+.4} ({percent:+.2}%)"),
        None => format!("{arrow} {change:+.4}"),
    })
}

/// Creates a cell for displaying a rate change with color coding.
pub fn change_cell(currency: &Currency) -> Cell {
    let Some(text) = change_text(currency) else {
        return na_cell(false);
    };
    let color = match currency.direction() {
        Direction::Up => Color::Green,
        Direction::Down => Color::Red,
        Direction::Flat => Color::DarkGrey,
    };
    Cell::new(text).fg(color).set_alignment(CellAlignment::Right)
}

pub fn status_cell(status: RowStatus) -> Cell {
    match status {
        RowStatus::Confirmed => Cell::new(""),
        RowStatus::Provisional => Cell::new("unconfirmed").fg(Color::Yellow),
        RowStatus::Loading => Cell::new("loading…").fg(Color::DarkGrey),
        RowStatus::Missing => Cell::new("no data").fg(Color::Red),
    }
}

/// Creates a cell for "N/A" values, with error-specific styling.
pub fn na_cell(has_error: bool) -> Cell {
    let color = if has_error {
        Color::Red
    } else {
        Color::DarkGrey
    };
    Cell::new("N/A").fg(color).set_alignment(CellAlignment::Right)
}

/// Renders a duration as "Ns ago", "Nm ago" or "Nh ago".
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs < 60 {
        format!("{secs}s ago")
    } else if secs < 60 * 60 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

pub fn format_since(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format_elapsed((now - at).to_std().unwrap_or_default())
}

/// Creates a spinner shown while the first fetch is in flight.
pub fn new_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(spinner_style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "0s ago");
        assert_eq!(format_elapsed(Duration::from_secs(59)), "59s ago");
        assert_eq!(format_elapsed(Duration::from_secs(60)), "1m ago");
        assert_eq!(format_elapsed(Duration::from_secs(3599)), "59m ago");
        assert_eq!(format_elapsed(Duration::from_secs(7300)), "2h ago");
    }

    #[test]
    fn test_format_since_clamps_future_times() {
        let now = Utc::now();
        assert_eq!(format_since(now + chrono::Duration::seconds(5), now), "0s ago");
        assert_eq!(format_since(now - chrono::Duration::seconds(90), now), "1m ago");
    }

    #[test]
    fn test_change_text() {
        let usd = Currency::new("USD", "US Dollar", 90.0, Some(89.0));
        assert_eq!(change_text(&usd).unwrap(), "▲ +1.0000 (+1.12%)");

        let jpy = Currency::new("JPY", "Japanese Yen", 60.0, Some(61.0));
        assert_eq!(change_text(&jpy).unwrap(), "▼ -1.0000 (-1.64%)");

        let zero = Currency::new("XXX", "Zero", 1.0, Some(0.0));
        assert_eq!(change_text(&zero).unwrap(), "▲ +1.0000");

        assert!(change_text(&Currency::new("EUR", "Euro", 98.0, None)).is_none());
    }
}
