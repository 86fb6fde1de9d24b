use super::util::{build_url, get_json, http_client, is_hourly, rank_by_market_cap};
use crate::core::asset::{Asset, PriceSeries, SearchMatch};
use crate::core::market::{MarketDataProvider, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use tracing::instrument;

const NAME: &str = "coingecko";

/// Primary, keyless provider.
pub struct CoinGeckoProvider {
    base_url: String,
    client: reqwest::Client,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str) -> Self {
        CoinGeckoProvider {
            base_url: base_url.to_string(),
            client: http_client(),
        }
    }

    async fn fetch_markets(&self, per_page: usize, ids: Option<&[String]>) -> Result<Vec<Asset>> {
        let mut params = vec![
            ("vs_currency", "usd".to_string()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", per_page.to_string()),
            ("page", "1".to_string()),
            ("sparkline", "false".to_string()),
            ("price_change_percentage", "24h,7d".to_string()),
        ];
        if let Some(ids) = ids {
            params.push(("ids", ids.join(",")));
        }

        let url = build_url(NAME, &self.base_url, &["api", "v3", "coins", "markets"], &params)?;
        let markets: Vec<MarketItem> = get_json(&self.client, NAME, url, HeaderMap::new()).await?;
        let assets = markets.into_iter().map(Asset::from).collect();
        Ok(rank_by_market_cap(assets, per_page))
    }
}

#[derive(Deserialize, Debug)]
struct MarketItem {
    id: String,
    symbol: String,
    name: String,
    #[serde(default)]
    image: Option<String>,
    current_price: Option<f64>,
    market_cap: Option<f64>,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    price_change_percentage_24h_in_currency: Option<f64>,
    #[serde(default)]
    price_change_percentage_7d_in_currency: Option<f64>,
}

impl From<MarketItem> for Asset {
    fn from(item: MarketItem) -> Self {
        Asset {
            id: item.id,
            symbol: item.symbol,
            name: item.name,
            current_price: item.current_price.unwrap_or(0.0),
            price_change_24h: item
                .price_change_percentage_24h_in_currency
                .or(item.price_change_percentage_24h),
            price_change_7d: item.price_change_percentage_7d_in_currency,
            market_cap: item.market_cap.unwrap_or(0.0),
            image: item.image.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct SearchResponse {
    coins: Vec<SearchCoin>,
}

#[derive(Deserialize, Debug)]
struct SearchCoin {
    id: String,
    name: String,
    symbol: String,
    #[serde(default)]
    thumb: String,
}

#[derive(Deserialize, Debug)]
struct MarketChartResponse {
    prices: Vec<(f64, Option<f64>)>,
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    #[instrument(name = "CoinGeckoTopAssets", skip(self))]
    async fn fetch_top_assets(&self, limit: usize) -> Result<Vec<Asset>> {
        self.fetch_markets(limit, None).await
    }

    #[instrument(name = "CoinGeckoSearch", skip(self))]
    async fn search_assets(&self, query: &str) -> Result<Vec<SearchMatch>> {
        let url = build_url(
            NAME,
            &self.base_url,
            &["api", "v3", "search"],
            &[("query", query.to_string())],
        )?;
        let data: SearchResponse = get_json(&self.client, NAME, url, HeaderMap::new()).await?;
        Ok(data
            .coins
            .into_iter()
            .map(|coin| SearchMatch {
                id: coin.id,
                name: coin.name,
                symbol: coin.symbol,
                thumb: coin.thumb,
            })
            .collect())
    }

    #[instrument(name = "CoinGeckoPriceHistory", skip(self))]
    async fn fetch_price_history(&self, asset_id: &str, days: u32) -> Result<PriceSeries> {
        let interval = if is_hourly(days) { "hourly" } else { "daily" };
        let url = build_url(
            NAME,
            &self.base_url,
            &["api", "v3", "coins", asset_id, "market_chart"],
            &[
                ("vs_currency", "usd".to_string()),
                ("days", days.to_string()),
                ("interval", interval.to_string()),
            ],
        )?;
        let data: MarketChartResponse = get_json(&self.client, NAME, url, HeaderMap::new()).await?;
        Ok(data
            .prices
            .into_iter()
            .filter_map(|(timestamp, price)| price.map(|p| (timestamp as i64, p)))
            .collect())
    }

    #[instrument(name = "CoinGeckoAssetsByIds", skip(self))]
    async fn fetch_assets_by_ids(&self, ids: &[String]) -> Result<Vec<Asset>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_markets(ids.len(), Some(ids)).await
    }
}
