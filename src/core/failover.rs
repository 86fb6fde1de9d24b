//! Ordered failover across market data providers.

use crate::core::asset::{Asset, PriceSeries, SearchMatch};
use crate::core::config::AppConfig;
use crate::core::error::{MarketDataError, Operation};
use crate::core::market::{MarketDataProvider, Result};
use crate::providers::{
    coincap::CoinCapProvider, coingecko::CoinGeckoProvider, coinmarketcap::CoinMarketCapProvider,
};
use futures::future::{BoxFuture, join_all};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailoverSettings {
    /// Failure flags are cleared once this much time passed since the last reset.
    pub reset_interval: Duration,
    /// Pause before moving on to the next provider after a failure.
    pub retry_delay: Duration,
}

impl Default for FailoverSettings {
    fn default() -> Self {
        Self {
            reset_interval: Duration::from_secs(5 * 60),
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Per-provider failure flags sharing one reset timestamp.
#[derive(Debug)]
struct ProviderHealth {
    failed: Vec<bool>,
    last_reset: Instant,
}

impl ProviderHealth {
    fn new(providers: usize) -> Self {
        Self {
            failed: vec![false; providers],
            last_reset: Instant::now(),
        }
    }

    fn clear(&mut self) {
        self.failed.iter_mut().for_each(|flag| *flag = false);
        self.last_reset = Instant::now();
    }

    /// Indices to try, in priority order.
    fn candidates(&mut self, reset_interval: Duration) -> Vec<usize> {
        if self.last_reset.elapsed() > reset_interval {
            debug!("Provider health reset interval elapsed, clearing failure flags");
            self.clear();
        }

        let healthy: Vec<usize> = (0..self.failed.len())
            .filter(|&index| !self.failed[index])
            .collect();
        if healthy.is_empty() {
            debug!("Every provider is marked failed, clearing flags and trying all of them");
            self.clear();
            return (0..self.failed.len()).collect();
        }
        healthy
    }
}

type ProviderFuture<'a, T> = BoxFuture<'a, Result<T>>;

/// Runs each operation against providers in fixed priority order and returns
/// the first success.
///
/// A provider that fails any operation is skipped for every operation until
/// the next health reset.
pub struct FailoverClient {
    providers: Vec<Arc<dyn MarketDataProvider>>,
    health: Mutex<ProviderHealth>,
    settings: FailoverSettings,
}

impl FailoverClient {
    pub fn new(providers: Vec<Arc<dyn MarketDataProvider>>, settings: FailoverSettings) -> Self {
        let health = Mutex::new(ProviderHealth::new(providers.len()));
        Self {
            providers,
            health,
            settings,
        }
    }

    /// CoinGecko, then CoinCap, then CoinMarketCap.
    pub fn from_config(config: &AppConfig) -> Self {
        let providers = &config.providers;
        let chain: Vec<Arc<dyn MarketDataProvider>> = vec![
            Arc::new(CoinGeckoProvider::new(&providers.coingecko.base_url)),
            Arc::new(CoinCapProvider::new(&providers.coincap.base_url)),
            Arc::new(CoinMarketCapProvider::new(
                &providers.coinmarketcap.base_url,
                providers.coinmarketcap.api_key.clone(),
            )),
        ];
        Self::new(chain, config.failover.settings())
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Names of the providers currently marked failed.
    pub fn failed_providers(&self) -> Vec<&'static str> {
        let health = self.health.lock().unwrap_or_else(PoisonError::into_inner);
        self.providers
            .iter()
            .zip(&health.failed)
            .filter(|(_, failed)| **failed)
            .map(|(provider, _)| provider.name())
            .collect()
    }

    pub async fn get_top_assets(&self, limit: usize) -> Result<Vec<Asset>> {
        self.execute(Operation::TopAssets, move |provider| {
            provider.fetch_top_assets(limit)
        })
        .await
    }

    pub async fn search_assets(&self, query: &str) -> Result<Vec<SearchMatch>> {
        let query = query.to_string();
        self.execute(Operation::Search, move |provider| {
            let query = query.clone();
            Box::pin(async move { provider.search_assets(&query).await })
        })
        .await
    }

    pub async fn get_price_history(&self, asset_id: &str, days: u32) -> Result<PriceSeries> {
        let asset_id = asset_id.to_string();
        self.execute(Operation::PriceHistory, move |provider| {
            let asset_id = asset_id.clone();
            Box::pin(async move { provider.fetch_price_history(&asset_id, days).await })
        })
        .await
    }

    pub async fn get_assets_by_ids(&self, ids: &[String]) -> Result<Vec<Asset>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.to_vec();
        self.execute(Operation::AssetsByIds, move |provider| {
            let ids = ids.clone();
            Box::pin(async move { provider.fetch_assets_by_ids(&ids).await })
        })
        .await
    }

    /// One failover sequence per asset, run concurrently. Results keep the
    /// order of `asset_ids`; `update_callback` fires as each one finishes.
    pub async fn fetch_price_histories(
        &self,
        asset_ids: &[String],
        days: u32,
        update_callback: &(dyn Fn() + Sync),
    ) -> Vec<(String, Result<PriceSeries>)> {
        let futures = asset_ids.iter().map(|id| async move {
            let result = self.get_price_history(id, days).await;
            update_callback();
            (id.clone(), result)
        });
        join_all(futures).await
    }

    #[instrument(name = "Failover", skip_all, fields(operation = %operation))]
    async fn execute<T, F>(&self, operation: Operation, mut invoke: F) -> Result<T>
    where
        F: for<'a> FnMut(&'a dyn MarketDataProvider) -> ProviderFuture<'a, T>,
    {
        let candidates = {
            let mut health = self.health.lock().unwrap_or_else(PoisonError::into_inner);
            health.candidates(self.settings.reset_interval)
        };

        let mut last_error = None;
        let mut failures = 0;
        for (position, &index) in candidates.iter().enumerate() {
            let provider = self.providers[index].as_ref();
            debug!(provider = provider.name(), "Trying provider");

            match invoke(provider).await {
                Ok(value) => {
                    if failures > 0 {
                        info!(
                            provider = provider.name(),
                            failures, "Provider succeeded after earlier failures"
                        );
                    }
                    return Ok(value);
                }
                Err(err) if err.is_unsupported() => {
                    debug!(provider = provider.name(), "{err}");
                    last_error = Some(err);
                }
                Err(err) => {
                    warn!(provider = provider.name(), error = %err, "Provider failed, marking unhealthy");
                    self.mark_failed(index);
                    failures += 1;
                    last_error = Some(err);

                    if position + 1 < candidates.len() {
                        tokio::time::sleep(self.settings.retry_delay).await;
                    }
                }
            }
        }

        Err(MarketDataError::AllProvidersFailed {
            last: last_error.map(Box::new),
        })
    }

    fn mark_failed(&self, index: usize) {
        let mut health = self.health.lock().unwrap_or_else(PoisonError::into_inner);
        health.failed[index] = true;
    }
}
