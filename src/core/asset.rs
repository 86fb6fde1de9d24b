//! Market data domain types

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// A point-in-time market snapshot of one crypto asset, priced in USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Stable lowercase slug, e.g. `bitcoin`.
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub price_change_24h: Option<f64>,
    pub price_change_7d: Option<f64>,
    pub market_cap: f64,
    pub image: String,
}

/// Lightweight search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub thumb: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub price: f64,
}

/// Price observations for one asset, non-decreasing in timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series, ordering the points by timestamp.
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        Self { points }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Price recorded at exactly `timestamp`, if any. With repeated
    /// timestamps the earliest observation is returned.
    pub fn price_at(&self, timestamp: i64) -> Option<f64> {
        let index = self.points.partition_point(|p| p.timestamp < timestamp);
        self.points
            .get(index)
            .filter(|p| p.timestamp == timestamp)
            .map(|p| p.price)
    }
}

impl FromIterator<(i64, f64)> for PriceSeries {
    fn from_iter<I: IntoIterator<Item = (i64, f64)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(timestamp, price)| PricePoint { timestamp, price })
                .collect(),
        )
    }
}

/// An asset held in the portfolio with a user assigned allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAsset {
    pub asset: Asset,
    /// Percentage of the portfolio, nominally 0-100. Not clamped.
    pub allocation: f64,
    /// `allocation / 100 * total portfolio value`.
    pub value: f64,
}

impl PortfolioAsset {
    pub fn new(asset: Asset, allocation: f64, total_value: f64) -> Self {
        Self {
            asset,
            allocation,
            value: allocation / 100.0 * total_value,
        }
    }
}

/// Sum of allocations. Callers decide what to do when this isn't 100.
pub fn allocation_total(assets: &[PortfolioAsset]) -> f64 {
    assets.iter().map(|a| a.allocation).sum()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    OneDay,
    #[default]
    SevenDays,
    ThirtyDays,
    NinetyDays,
    OneYear,
}

impl Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TimeRange::OneDay => "1D",
                TimeRange::SevenDays => "7D",
                TimeRange::ThirtyDays => "30D",
                TimeRange::NinetyDays => "90D",
                TimeRange::OneYear => "1Y",
            }
        )
    }
}

impl TimeRange {
    pub fn days(&self) -> u32 {
        match self {
            TimeRange::OneDay => 1,
            TimeRange::SevenDays => 7,
            TimeRange::ThirtyDays => 30,
            TimeRange::NinetyDays => 90,
            TimeRange::OneYear => 365,
        }
    }
}

impl FromStr for TimeRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "1D" => Ok(TimeRange::OneDay),
            "7D" => Ok(TimeRange::SevenDays),
            "30D" => Ok(TimeRange::ThirtyDays),
            "90D" => Ok(TimeRange::NinetyDays),
            "1Y" => Ok(TimeRange::OneYear),
            _ => Err(anyhow::anyhow!("Invalid time range: {}", s)),
        }
    }
}

/// Day count for a time range label; unknown labels fall back to 7.
pub fn days_for_label(label: &str) -> u32 {
    label
        .parse::<TimeRange>()
        .unwrap_or_default()
        .days()
}

#[cfg(test)]
pub(crate) fn sample_asset(id: &str, price: f64, change_24h: Option<f64>) -> Asset {
    Asset {
        id: id.to_string(),
        symbol: id.chars().take(3).collect(),
        name: id.to_string(),
        current_price: price,
        price_change_24h: change_24h,
        price_change_7d: None,
        market_cap: 0.0,
        image: String::new(),
    }
}
