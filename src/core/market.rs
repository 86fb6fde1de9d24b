//! Market data provider abstraction

use crate::core::asset::{Asset, PriceSeries, SearchMatch};
use crate::core::error::MarketDataError;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, MarketDataError>;

/// Capabilities of one upstream market data source.
///
/// Every implementation normalizes its own wire format into [`Asset`] and
/// [`PriceSeries`]. A provider that cannot serve an operation returns
/// [`MarketDataError::UnsupportedOperation`] rather than an upstream error.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Stable short label used in logs, health tracking and errors.
    fn name(&self) -> &'static str;

    /// Assets ordered by market cap, descending, at most `limit` long.
    async fn fetch_top_assets(&self, limit: usize) -> Result<Vec<Asset>>;

    async fn search_assets(&self, query: &str) -> Result<Vec<SearchMatch>>;

    /// Hourly points when `days <= 1`, daily points otherwise.
    async fn fetch_price_history(&self, asset_id: &str, days: u32) -> Result<PriceSeries>;

    /// Same ordering rule as [`MarketDataProvider::fetch_top_assets`].
    async fn fetch_assets_by_ids(&self, ids: &[String]) -> Result<Vec<Asset>>;
}
