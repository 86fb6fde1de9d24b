//! Core business logic abstractions

pub mod analytics;
pub mod asset;
pub mod chart;
pub mod config;
pub mod error;
pub mod failover;
pub mod log;
pub mod market;

// Re-export main types for cleaner imports
pub use analytics::{PortfolioMetrics, compute_metrics};
pub use asset::{
    Asset, PortfolioAsset, PricePoint, PriceSeries, SearchMatch, TimeRange, allocation_total,
    days_for_label,
};
pub use chart::{ChartPoint, combine_series};
pub use error::{MarketDataError, Operation};
pub use failover::{FailoverClient, FailoverSettings};
pub use market::MarketDataProvider;
