//! Market listings: top assets, search and price history.
use super::ui;
use crate::core::{Asset, FailoverClient, PriceSeries, SearchMatch, TimeRange};
use anyhow::{Context, Result};
use chrono::DateTime;
use comfy_table::{Cell, CellAlignment};

const HISTORY_ROWS: usize = 12;

pub async fn show_top_assets(client: &FailoverClient, limit: usize) -> Result<()> {
    let assets = client
        .get_top_assets(limit)
        .await
        .context("Failed to fetch top assets")?;
    println!("{}", assets_table(&assets));
    Ok(())
}

pub async fn show_search(client: &FailoverClient, query: &str) -> Result<()> {
    let hits = client
        .search_assets(query)
        .await
        .with_context(|| format!("Search for '{query}' failed"))?;
    if hits.is_empty() {
        println!("No assets match '{query}'.");
        return Ok(());
    }
    println!("{}", search_table(&hits));
    Ok(())
}

pub async fn show_history(client: &FailoverClient, asset_id: &str, range: TimeRange) -> Result<()> {
    let series = client
        .get_price_history(asset_id, range.days())
        .await
        .with_context(|| format!("Failed to fetch {range} price history for {asset_id}"))?;
    if series.is_empty() {
        println!("No price history for {asset_id}.");
        return Ok(());
    }
    println!(
        "{}\n\n{}",
        ui::style_text(&format!("{asset_id} ({range})"), ui::StyleType::Title),
        history_table(&series)
    );
    Ok(())
}

fn assets_table(assets: &[Asset]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Asset"),
        ui::header_cell("Price"),
        ui::header_cell("24h"),
        ui::header_cell("7d"),
        ui::header_cell("Market Cap"),
    ]);

    for (rank, asset) in assets.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(format!("{} ({})", asset.name, asset.symbol.to_uppercase())),
            ui::usd_cell(asset.current_price),
            ui::change_cell(asset.price_change_24h),
            ui::change_cell(asset.price_change_7d),
            Cell::new(format!("${:.0}", asset.market_cap)).set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}

fn search_table(hits: &[SearchMatch]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Id"),
        ui::header_cell("Name"),
        ui::header_cell("Symbol"),
    ]);
    for hit in hits {
        table.add_row(vec![
            Cell::new(&hit.id),
            Cell::new(&hit.name),
            Cell::new(hit.symbol.to_uppercase()),
        ]);
    }
    table.to_string()
}

/// Evenly spaced sample of the series, always ending at the latest point.
fn history_table(series: &PriceSeries) -> String {
    let points = series.points();
    let step = points.len().div_ceil(HISTORY_ROWS).max(1);
    let first_price = points[0].price;

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Time (UTC)"),
        ui::header_cell("Price"),
        ui::header_cell("Change"),
    ]);

    let mut sampled: Vec<_> = points.iter().step_by(step).collect();
    if let Some(last) = points.last() {
        if sampled.last().map(|p| p.timestamp) != Some(last.timestamp) {
            sampled.push(last);
        }
    }

    for point in sampled {
        let time = DateTime::from_timestamp_millis(point.timestamp)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| point.timestamp.to_string());
        let change = (first_price != 0.0).then(|| (point.price - first_price) / first_price * 100.0);
        table.add_row(vec![
            Cell::new(time),
            ui::usd_cell(point.price),
            ui::change_cell(change),
        ]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_table_samples_and_keeps_last_point() {
        let series: PriceSeries = (0..30)
            .map(|day| (1_704_067_200_000 + day * 86_400_000, 100.0 + day as f64))
            .collect();

        let output = history_table(&series);

        assert!(output.contains("2024-01-01 00:00"));
        assert!(output.contains("2024-01-30 00:00"));
        assert!(output.contains("29.00%"));
        assert!(!output.contains("2024-01-02 00:00"));
    }
}
