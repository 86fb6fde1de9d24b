//! Joins per-asset price series into one chart series.

use crate::core::asset::{Asset, PortfolioAsset, PriceSeries};
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One row of the joint chart series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// ISO-8601 UTC rendering of `timestamp`.
    pub date: String,
    /// Prices of the assets that have a point at exactly this timestamp.
    pub prices: BTreeMap<String, f64>,
    pub portfolio_value: Option<f64>,
}

impl ChartPoint {
    pub fn price(&self, asset_id: &str) -> Option<f64> {
        self.prices.get(asset_id).copied()
    }
}

/// Builds chart rows on the distinct timestamps of the first asset's series.
///
/// Other assets appear only where their series has the exact same
/// timestamp; nothing is interpolated. When `portfolio` is given every row
/// also gets a portfolio value, summing `price * allocation / 100 *
/// value / current_price` over holdings with a positive allocation.
pub fn combine_series(
    series: &HashMap<String, PriceSeries>,
    assets: &[Asset],
    portfolio: Option<&[PortfolioAsset]>,
) -> Vec<ChartPoint> {
    let Some(first) = assets.first().and_then(|a| series.get(&a.id)) else {
        return Vec::new();
    };

    let mut previous = None;
    first
        .points()
        .iter()
        .filter(|point| previous.replace(point.timestamp) != Some(point.timestamp))
        .map(|anchor| {
            let prices: BTreeMap<String, f64> = assets
                .iter()
                .filter_map(|asset| {
                    series
                        .get(&asset.id)
                        .and_then(|s| s.price_at(anchor.timestamp))
                        .map(|price| (asset.id.clone(), price))
                })
                .collect();

            let portfolio_value = portfolio.map(|holdings| portfolio_value(&prices, holdings));

            ChartPoint {
                timestamp: anchor.timestamp,
                date: iso_date(anchor.timestamp),
                prices,
                portfolio_value,
            }
        })
        .collect()
}

fn portfolio_value(prices: &BTreeMap<String, f64>, holdings: &[PortfolioAsset]) -> f64 {
    holdings
        .iter()
        .filter(|h| h.allocation > 0.0 && h.asset.current_price != 0.0)
        .filter_map(|h| {
            prices.get(&h.asset.id).map(|price| {
                price * (h.allocation / 100.0) * (h.value / h.asset.current_price)
            })
        })
        .sum()
}

fn iso_date(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}
