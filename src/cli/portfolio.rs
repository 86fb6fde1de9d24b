use super::ui;
use crate::core::{
    ChartPoint, FailoverClient, PortfolioAsset, PortfolioMetrics, TimeRange, allocation_total,
    combine_series, compute_metrics,
};
use anyhow::{Context, Result};
use comfy_table::{Cell, CellAlignment};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Fully computed view of a portfolio for one time range.
#[derive(Debug)]
pub struct PortfolioReport {
    pub holdings: Vec<PortfolioAsset>,
    pub chart: Vec<ChartPoint>,
    pub metrics: PortfolioMetrics,
    pub range: TimeRange,
    pub warnings: Vec<String>,
}

/// Fetches market data for `allocations` (asset id, percent) and computes
/// the portfolio metrics and chart.
pub async fn build_report(
    client: &FailoverClient,
    allocations: &[(String, f64)],
    total_value: f64,
    range: TimeRange,
    update_callback: &(dyn Fn() + Sync),
) -> Result<PortfolioReport> {
    let ids: Vec<String> = allocations.iter().map(|(id, _)| id.clone()).collect();
    let assets = client
        .get_assets_by_ids(&ids)
        .await
        .context("Failed to fetch portfolio assets")?;
    let mut by_id: HashMap<String, _> = assets.into_iter().map(|a| (a.id.clone(), a)).collect();

    let mut warnings = Vec::new();
    let holdings: Vec<PortfolioAsset> = allocations
        .iter()
        .filter_map(|(id, allocation)| match by_id.remove(id) {
            Some(asset) => Some(PortfolioAsset::new(asset, *allocation, total_value)),
            None => {
                warnings.push(format!("No market data for '{id}'"));
                None
            }
        })
        .collect();

    let held_ids: Vec<String> = holdings.iter().map(|h| h.asset.id.clone()).collect();
    let histories = client
        .fetch_price_histories(&held_ids, range.days(), update_callback)
        .await;

    let mut series = HashMap::new();
    for (id, result) in histories {
        match result {
            Ok(history) => {
                debug!(asset = %id, points = history.len(), "Fetched price history");
                series.insert(id, history);
            }
            Err(e) => {
                warn!(asset = %id, error = %e, "Price history unavailable");
                warnings.push(format!("Price history for '{id}' unavailable: {e}"));
            }
        }
    }

    let chart_assets: Vec<_> = holdings.iter().map(|h| h.asset.clone()).collect();
    let chart = combine_series(&series, &chart_assets, Some(&holdings));
    let metrics = compute_metrics(&holdings, total_value, Some(&chart), Some(range));

    let allocated = allocation_total(&holdings);
    if (allocated - 100.0).abs() > f64::EPSILON {
        warnings.push(format!("Allocations add up to {allocated:.2}%, not 100%"));
    }

    Ok(PortfolioReport {
        holdings,
        chart,
        metrics,
        range,
        warnings,
    })
}

impl PortfolioReport {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Asset"),
            ui::header_cell("Price"),
            ui::header_cell("24h"),
            ui::header_cell("7d"),
            ui::header_cell("Allocation (%)"),
            ui::header_cell("Value"),
        ]);

        for holding in &self.holdings {
            let asset = &holding.asset;
            table.add_row(vec![
                Cell::new(format!("{} ({})", asset.name, asset.symbol.to_uppercase())),
                ui::usd_cell(asset.current_price),
                ui::change_cell(asset.price_change_24h),
                ui::change_cell(asset.price_change_7d),
                Cell::new(format!("{:.2}", holding.allocation)).set_alignment(CellAlignment::Right),
                ui::usd_cell(holding.value),
            ]);
        }

        let metrics = &self.metrics;
        let mut output = format!(
            "{}\n\n{}\n\n",
            ui::style_text(&format!("Portfolio ({})", self.range), ui::StyleType::Title),
            table
        );
        output.push_str(&format!(
            "{}: {}\n",
            ui::style_text("Total Value", ui::StyleType::Label),
            ui::style_text(&ui::format_usd(metrics.total_value), ui::StyleType::Figure)
        ));
        output.push_str(&format!(
            "{}: {}\n",
            ui::style_text("Return", ui::StyleType::Label),
            ui::style_change(
                &format!(
                    "{} ({:.2}%)",
                    ui::format_usd(metrics.total_return),
                    metrics.total_return_percentage
                ),
                metrics.total_return
            )
        ));
        output.push_str(&format!(
            "{}: {:.2}%\n",
            ui::style_text("Volatility", ui::StyleType::Label),
            metrics.volatility
        ));

        let values: Vec<f64> = self.chart.iter().filter_map(|p| p.portfolio_value).collect();
        if let (Some(first), Some(last)) = (values.first(), values.last()) {
            output.push_str(&format!(
                "{}: {} -> {} over {} points\n",
                ui::style_text("Chart", ui::StyleType::Label),
                ui::format_usd(*first),
                ui::format_usd(*last),
                self.chart.len()
            ));
        }

        for warning in &self.warnings {
            output.push_str(&format!("\n{}", ui::style_text(warning, ui::StyleType::Warning)));
        }
        output
    }
}

pub async fn show_portfolio(
    client: &FailoverClient,
    allocations: &[(String, f64)],
    total_value: f64,
    range: TimeRange,
) -> Result<()> {
    if allocations.is_empty() {
        println!(
            "{}",
            ui::style_text("No assets given, add some with --asset id=allocation", ui::StyleType::Subtle)
        );
        return Ok(());
    }

    let pb = ui::new_progress_bar(allocations.len() as u64);
    let report = build_report(client, allocations, total_value, range, &|| pb.inc(1)).await;
    pb.finish_and_clear();

    println!("{}", report?.display_as_table());
    Ok(())
}
