//! Portfolio metrics derived from allocations and price history.
use crate::core::asset::{PortfolioAsset, TimeRange};
use crate::core::chart::ChartPoint;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Valuation, return and volatility of a portfolio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub total_value: f64,
    /// Return in currency units.
    pub total_return: f64,
    /// Allocation-weighted return, in percent.
    pub total_return_percentage: f64,
    /// Population standard deviation of the per-asset returns, in percent.
    pub volatility: f64,
}

/// Computes portfolio metrics.
///
/// With a combined price history of at least two points, each asset's return
/// is measured between the first and last point; assets without a usable
/// first price are left out of the volatility sample and add nothing to the
/// weighted return. Otherwise the 24 hour change stands in for the return.
///
/// Allocations are used as given, never normalized to 100.
pub fn compute_metrics(
    assets: &[PortfolioAsset],
    total_value: f64,
    history: Option<&[ChartPoint]>,
    time_range: Option<TimeRange>,
) -> PortfolioMetrics {
    if assets.is_empty() {
        return PortfolioMetrics::default();
    }

    let mut returns = Vec::with_capacity(assets.len());
    let mut weighted_return = 0.0;

    match history.filter(|points| points.len() >= 2) {
        Some(points) => {
            debug!(
                range = ?time_range,
                points = points.len(),
                "Computing returns from price history"
            );
            let (first, last) = (&points[0], &points[points.len() - 1]);
            for holding in assets {
                let id = &holding.asset.id;
                let (Some(start), Some(end)) = (first.price(id), last.price(id)) else {
                    debug!("Skipping {id}: missing price at range boundary");
                    continue;
                };
                if start == 0.0 {
                    debug!("Skipping {id}: zero starting price");
                    continue;
                }
                let asset_return = (end - start) / start * 100.0;
                weighted_return += asset_return * holding.allocation / 100.0;
                returns.push(asset_return);
            }
        }
        None => {
            debug!("No usable price history, using 24h change as return");
            for holding in assets {
                let asset_return = holding.asset.price_change_24h.unwrap_or(0.0);
                weighted_return += asset_return * holding.allocation / 100.0;
                returns.push(asset_return);
            }
        }
    }

    PortfolioMetrics {
        total_value,
        total_return: weighted_return / 100.0 * total_value,
        total_return_percentage: weighted_return,
        volatility: population_std_dev(&returns),
    }
}

fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::sample_asset;
    use std::collections::BTreeMap;

    fn holding(id: &str, price: f64, change_24h: f64, allocation: f64) -> PortfolioAsset {
        PortfolioAsset::new(sample_asset(id, price, Some(change_24h)), allocation, 10000.0)
    }

    fn point(timestamp: i64, prices: &[(&str, f64)]) -> ChartPoint {
        ChartPoint {
            timestamp,
            date: String::new(),
            prices: prices
                .iter()
                .map(|(id, p)| (id.to_string(), *p))
                .collect::<BTreeMap<_, _>>(),
            portfolio_value: None,
        }
    }

    #[test]
    fn test_empty_portfolio_is_all_zero() {
        for total in [0.0, 10000.0, -5.0] {
            assert_eq!(
                compute_metrics(&[], total, None, None),
                PortfolioMetrics::default()
            );
        }
    }

    #[test]
    fn test_offsetting_24h_changes() {
        let assets = vec![
            holding("bitcoin", 45000.0, 10.0, 50.0),
            holding("ethereum", 3000.0, -10.0, 50.0),
        ];

        let metrics = compute_metrics(&assets, 10000.0, None, None);

        assert_eq!(metrics.total_value, 10000.0);
        assert_eq!(metrics.total_return_percentage, 0.0);
        assert_eq!(metrics.total_return, 0.0);
        assert!((metrics.volatility - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_return_is_linear_in_allocation() {
        let base = vec![
            holding("bitcoin", 45000.0, 4.0, 25.0),
            holding("ethereum", 3000.0, 2.0, 50.0),
        ];
        let doubled = vec![
            holding("bitcoin", 45000.0, 4.0, 50.0),
            holding("ethereum", 3000.0, 2.0, 50.0),
        ];

        let before = compute_metrics(&base, 1000.0, None, None);
        let after = compute_metrics(&doubled, 1000.0, None, None);

        // bitcoin contributes 1% at 25 allocation and 2% at 50.
        assert!((before.total_return_percentage - 2.0).abs() < 1e-9);
        assert!((after.total_return_percentage - 3.0).abs() < 1e-9);
        assert!((after.total_return - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_history_returns_take_precedence_over_24h_change() {
        let assets = vec![
            holding("bitcoin", 45000.0, 99.0, 50.0),
            holding("ethereum", 3000.0, 99.0, 50.0),
        ];
        let history = vec![
            point(1, &[("bitcoin", 100.0), ("ethereum", 200.0)]),
            point(2, &[("bitcoin", 105.0)]),
            point(3, &[("bitcoin", 110.0), ("ethereum", 180.0)]),
        ];

        let metrics = compute_metrics(&assets, 10000.0, Some(&history), Some(TimeRange::SevenDays));

        // returns: +10% and -10%
        assert!(metrics.total_return_percentage.abs() < 1e-9);
        assert!((metrics.volatility - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_history_skips_assets_without_usable_start_price() {
        let assets = vec![
            holding("bitcoin", 45000.0, 0.0, 50.0),
            holding("ethereum", 3000.0, 0.0, 50.0),
            holding("solana", 150.0, 0.0, 50.0),
        ];
        let history = vec![
            point(1, &[("bitcoin", 100.0), ("ethereum", 0.0)]),
            point(2, &[("bitcoin", 120.0), ("ethereum", 10.0), ("solana", 5.0)]),
        ];

        let metrics = compute_metrics(&assets, 1000.0, Some(&history), None);

        assert!((metrics.total_return_percentage - 10.0).abs() < 1e-9);
        assert!((metrics.total_return - 100.0).abs() < 1e-9);
        // single sample
        assert_eq!(metrics.volatility, 0.0);
    }

    #[test]
    fn test_single_point_history_falls_back_to_24h_change() {
        let assets = vec![holding("bitcoin", 45000.0, 5.0, 100.0)];
        let history = vec![point(1, &[("bitcoin", 100.0)])];

        let metrics = compute_metrics(&assets, 2000.0, Some(&history), None);

        assert!((metrics.total_return_percentage - 5.0).abs() < 1e-9);
        assert!((metrics.total_return - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_24h_change_counts_as_zero_return() {
        let mut no_change = holding("tether", 1.0, 0.0, 50.0);
        no_change.asset.price_change_24h = None;
        let assets = vec![no_change, holding("bitcoin", 45000.0, 8.0, 50.0)];

        let metrics = compute_metrics(&assets, 1000.0, None, None);

        assert!((metrics.total_return_percentage - 4.0).abs() < 1e-9);
        assert!((metrics.volatility - 4.0).abs() < 1e-9);
    }
}
