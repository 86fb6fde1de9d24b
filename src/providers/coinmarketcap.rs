use super::util::{build_url, get_json, http_client, rank_by_market_cap};
use crate::core::asset::{Asset, PriceSeries, SearchMatch};
use crate::core::error::{MarketDataError, Operation};
use crate::core::market::{MarketDataProvider, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

const NAME: &str = "coinmarketcap";
const API_KEY_HEADER: &str = "x-cmc_pro_api_key";

/// Credentialed provider. Without an API key every request is rejected
/// upstream, so it only ever serves as the last resort.
pub struct CoinMarketCapProvider {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl CoinMarketCapProvider {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        CoinMarketCapProvider {
            base_url: base_url.to_string(),
            api_key,
            client: http_client(),
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match self.api_key.as_deref().map(HeaderValue::from_str) {
            Some(Ok(value)) => {
                headers.insert(API_KEY_HEADER, value);
            }
            Some(Err(e)) => debug!("Ignoring unusable CoinMarketCap API key: {e}"),
            None => debug!("No CoinMarketCap API key configured"),
        }
        headers
    }
}

#[derive(Deserialize, Debug)]
struct ListingsResponse {
    data: Vec<Listing>,
}

#[derive(Deserialize, Debug)]
struct QuotesResponse {
    data: HashMap<String, Listing>,
}

#[derive(Deserialize, Debug)]
struct Listing {
    id: u64,
    name: String,
    symbol: String,
    slug: String,
    quote: HashMap<String, UsdQuote>,
}

#[derive(Deserialize, Debug)]
struct UsdQuote {
    price: Option<f64>,
    percent_change_24h: Option<f64>,
    percent_change_7d: Option<f64>,
    market_cap: Option<f64>,
}

impl From<Listing> for Asset {
    fn from(listing: Listing) -> Self {
        let usd = listing.quote.get("USD");
        Asset {
            id: listing.slug,
            symbol: listing.symbol,
            name: listing.name,
            current_price: usd.and_then(|q| q.price).unwrap_or(0.0),
            price_change_24h: usd.and_then(|q| q.percent_change_24h),
            price_change_7d: usd.and_then(|q| q.percent_change_7d),
            market_cap: usd.and_then(|q| q.market_cap).unwrap_or(0.0),
            image: format!(
                "https://s2.coinmarketcap.com/static/img/coins/64x64/{}.png",
                listing.id
            ),
        }
    }
}

#[async_trait]
impl MarketDataProvider for CoinMarketCapProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    #[instrument(name = "CoinMarketCapTopAssets", skip(self))]
    async fn fetch_top_assets(&self, limit: usize) -> Result<Vec<Asset>> {
        let url = build_url(
            NAME,
            &self.base_url,
            &["v1", "cryptocurrency", "listings", "latest"],
            &[
                ("start", "1".to_string()),
                ("limit", limit.to_string()),
                ("convert", "USD".to_string()),
            ],
        )?;
        let data: ListingsResponse = get_json(&self.client, NAME, url, self.headers()).await?;
        Ok(rank_by_market_cap(
            data.data.into_iter().map(Asset::from).collect(),
            limit,
        ))
    }

    async fn search_assets(&self, _query: &str) -> Result<Vec<SearchMatch>> {
        Err(MarketDataError::unsupported(NAME, Operation::Search))
    }

    async fn fetch_price_history(&self, _asset_id: &str, _days: u32) -> Result<PriceSeries> {
        Err(MarketDataError::unsupported(NAME, Operation::PriceHistory))
    }

    #[instrument(name = "CoinMarketCapAssetsByIds", skip(self))]
    async fn fetch_assets_by_ids(&self, ids: &[String]) -> Result<Vec<Asset>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = build_url(
            NAME,
            &self.base_url,
            &["v2", "cryptocurrency", "quotes", "latest"],
            &[("slug", ids.join(",")), ("convert", "USD".to_string())],
        )?;
        let data: QuotesResponse = get_json(&self.client, NAME, url, self.headers()).await?;
        Ok(rank_by_market_cap(
            data.data.into_values().map(Asset::from).collect(),
            ids.len(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LISTINGS_JSON: &str = r#"{
        "status": {"error_code": 0},
        "data": [
            {
                "id": 1027, "name": "Ethereum", "symbol": "ETH", "slug": "ethereum",
                "quote": {"USD": {"price": 3000.0, "percent_change_24h": 1.0,
                                  "percent_change_7d": 5.0, "market_cap": 360000000000.0}}
            },
            {
                "id": 1, "name": "Bitcoin", "symbol": "BTC", "slug": "bitcoin",
                "quote": {"USD": {"price": 45000.0, "percent_change_24h": 2.0,
                                  "percent_change_7d": -3.0, "market_cap": 880000000000.0}}
            }
        ]
    }"#;

    #[tokio::test]
    async fn test_missing_api_key_is_rejected_upstream() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/cryptocurrency/listings/latest"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;
        let provider = CoinMarketCapProvider::new(&mock_server.uri(), None);

        let err = provider.fetch_top_assets(10).await.unwrap_err();

        assert!(matches!(
            err,
            MarketDataError::Upstream {
                provider: "coinmarketcap",
                status: Some(401),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_top_assets_with_api_key() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/cryptocurrency/listings/latest"))
            .and(header(API_KEY_HEADER, "test-key"))
            .and(query_param("convert", "USD"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTINGS_JSON))
            .mount(&mock_server)
            .await;
        let provider =
            CoinMarketCapProvider::new(&mock_server.uri(), Some("test-key".to_string()));

        let assets = provider.fetch_top_assets(10).await.unwrap();

        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].id, "bitcoin");
        assert_eq!(assets[0].price_change_7d, Some(-3.0));
        assert_eq!(
            assets[0].image,
            "https://s2.coinmarketcap.com/static/img/coins/64x64/1.png"
        );
        assert_eq!(assets[1].id, "ethereum");
    }

    #[tokio::test]
    async fn test_assets_by_slug() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/cryptocurrency/quotes/latest"))
            .and(query_param("slug", "bitcoin"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"data": {"1": {"id": 1, "name": "Bitcoin", "symbol": "BTC", "slug": "bitcoin",
                    "quote": {"USD": {"price": 45000.0, "percent_change_24h": 2.0,
                                      "percent_change_7d": null, "market_cap": 880000000000.0}}}}}"#,
            ))
            .mount(&mock_server)
            .await;
        let provider =
            CoinMarketCapProvider::new(&mock_server.uri(), Some("test-key".to_string()));

        let assets = provider
            .fetch_assets_by_ids(&["bitcoin".to_string()])
            .await
            .unwrap();

        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].current_price, 45000.0);
        assert_eq!(assets[0].price_change_7d, None);
    }

    #[tokio::test]
    async fn test_search_and_history_are_unsupported() {
        let provider = CoinMarketCapProvider::new("http://127.0.0.1:9", None);

        assert!(provider.search_assets("btc").await.unwrap_err().is_unsupported());
        assert!(
            provider
                .fetch_price_history("bitcoin", 7)
                .await
                .unwrap_err()
                .is_unsupported()
        );
    }
}
