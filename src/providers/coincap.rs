use super::util::{build_url, get_json, http_client, is_hourly, rank_by_market_cap};
use crate::core::asset::{Asset, PriceSeries, SearchMatch};
use crate::core::market::{MarketDataProvider, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use tracing::{debug, instrument};

const NAME: &str = "coincap";
const SEARCH_LIMIT: usize = 10;

/// Secondary, keyless provider. CoinCap only reports a 24 hour change.
pub struct CoinCapProvider {
    base_url: String,
    client: reqwest::Client,
}

impl CoinCapProvider {
    pub fn new(base_url: &str) -> Self {
        CoinCapProvider {
            base_url: base_url.to_string(),
            client: http_client(),
        }
    }

    async fn fetch_assets(&self, params: &[(&str, String)]) -> Result<Vec<CoinCapAsset>> {
        let url = build_url(NAME, &self.base_url, &["v2", "assets"], params)?;
        let data: AssetsResponse = get_json(&self.client, NAME, url, HeaderMap::new()).await?;
        Ok(data.data)
    }
}

#[derive(Deserialize, Debug)]
struct AssetsResponse {
    data: Vec<CoinCapAsset>,
}

// CoinCap encodes every number as a string.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CoinCapAsset {
    id: String,
    symbol: String,
    name: String,
    price_usd: Option<String>,
    market_cap_usd: Option<String>,
    #[serde(rename = "changePercent24Hr")]
    change_percent_24_hr: Option<String>,
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.parse().ok())
}

fn icon_url(symbol: &str) -> String {
    format!(
        "https://assets.coincap.io/assets/icons/{}@2x.png",
        symbol.to_lowercase()
    )
}

impl From<CoinCapAsset> for Asset {
    fn from(item: CoinCapAsset) -> Self {
        let change_24h = parse_number(item.change_percent_24_hr.as_deref());
        debug!(
            asset = %item.id,
            "CoinCap has no 7d change, reporting the 24h change for it"
        );
        Asset {
            image: icon_url(&item.symbol),
            id: item.id,
            symbol: item.symbol,
            name: item.name,
            current_price: parse_number(item.price_usd.as_deref()).unwrap_or(0.0),
            price_change_24h: change_24h,
            price_change_7d: change_24h,
            market_cap: parse_number(item.market_cap_usd.as_deref()).unwrap_or(0.0),
        }
    }
}

#[derive(Deserialize, Debug)]
struct HistoryResponse {
    data: Vec<HistoryPoint>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct HistoryPoint {
    price_usd: String,
    time: i64,
}

#[async_trait]
impl MarketDataProvider for CoinCapProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    #[instrument(name = "CoinCapTopAssets", skip(self))]
    async fn fetch_top_assets(&self, limit: usize) -> Result<Vec<Asset>> {
        let assets = self.fetch_assets(&[("limit", limit.to_string())]).await?;
        Ok(rank_by_market_cap(
            assets.into_iter().map(Asset::from).collect(),
            limit,
        ))
    }

    #[instrument(name = "CoinCapSearch", skip(self))]
    async fn search_assets(&self, query: &str) -> Result<Vec<SearchMatch>> {
        let assets = self
            .fetch_assets(&[
                ("search", query.to_string()),
                ("limit", SEARCH_LIMIT.to_string()),
            ])
            .await?;
        Ok(assets
            .into_iter()
            .map(|item| SearchMatch {
                thumb: icon_url(&item.symbol),
                id: item.id,
                name: item.name,
                symbol: item.symbol,
            })
            .collect())
    }

    #[instrument(name = "CoinCapPriceHistory", skip(self))]
    async fn fetch_price_history(&self, asset_id: &str, days: u32) -> Result<PriceSeries> {
        let interval = if is_hourly(days) { "h1" } else { "d1" };
        let end = Utc::now();
        let start = end - Duration::days(i64::from(days));
        let url = build_url(
            NAME,
            &self.base_url,
            &["v2", "assets", asset_id, "history"],
            &[
                ("interval", interval.to_string()),
                ("start", start.timestamp_millis().to_string()),
                ("end", end.timestamp_millis().to_string()),
            ],
        )?;
        let data: HistoryResponse = get_json(&self.client, NAME, url, HeaderMap::new()).await?;
        Ok(data
            .data
            .into_iter()
            .filter_map(|point| {
                point
                    .price_usd
                    .parse::<f64>()
                    .ok()
                    .map(|price| (point.time, price))
            })
            .collect())
    }

    #[instrument(name = "CoinCapAssetsByIds", skip(self))]
    async fn fetch_assets_by_ids(&self, ids: &[String]) -> Result<Vec<Asset>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let assets = self.fetch_assets(&[("ids", ids.join(","))]).await?;
        Ok(rank_by_market_cap(
            assets.into_iter().map(Asset::from).collect(),
            ids.len(),
        ))
    }
}
