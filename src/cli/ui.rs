use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Text roles used across the market and portfolio views.
pub enum StyleType {
    Title,
    Label,
    Figure,
    Warning,
    Subtle,
}

pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = style(text);
    match style_type {
        StyleType::Title => styled.bold().underlined(),
        StyleType::Label => styled.bold(),
        StyleType::Figure => styled.green().bold(),
        StyleType::Warning => styled.yellow(),
        StyleType::Subtle => styled.dim(),
    }
    .to_string()
}

/// Green for gains, red for losses.
pub fn style_change(text: &str, change: f64) -> String {
    if change >= 0.0 {
        style(text).green().to_string()
    } else {
        style(text).red().to_string()
    }
}

/// Rounded UTF-8 table that wraps to the terminal width.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header_cell(text: &str) -> Cell {
    Cell::new(text).fg(Color::Cyan).add_attribute(Attribute::Bold)
}

/// Right aligned USD amount.
pub fn usd_cell(value: f64) -> Cell {
    Cell::new(format_usd(value)).set_alignment(CellAlignment::Right)
}

/// Sub-dollar amounts keep six decimals.
pub fn format_usd(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let amount = value.abs();
    if amount >= 1.0 {
        format!("{sign}${amount:.2}")
    } else {
        format!("{sign}${amount:.6}")
    }
}

/// Creates a cell for displaying percentage change with color coding.
/// `None` is displayed as "N/A".
pub fn change_cell(change: Option<f64>) -> Cell {
    let Some(change) = change else {
        return Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right);
    };
    let text = format!("{change:.2}%");
    let color = if change >= 0.0 {
        Color::Green
    } else {
        Color::Red
    };
    Cell::new(text)
        .fg(color)
        .set_alignment(CellAlignment::Right)
}

/// Creates a new `indicatif::ProgressBar` with standard styling.
pub fn new_progress_bar(len: u64) -> ProgressBar {
    let template = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}
