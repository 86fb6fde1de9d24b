use crate::core::asset::Asset;
use crate::core::error::MarketDataError;
use reqwest::Url;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

pub(crate) const USER_AGENT: &str = "coinfolio/0.1";

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            debug!("Falling back to default HTTP client: {e}");
            reqwest::Client::new()
        })
}

/// Appends `segments` to `base_url`, each percent-encoded as a single path
/// segment, followed by url-encoded query parameters.
pub(crate) fn build_url(
    provider: &'static str,
    base_url: &str,
    segments: &[&str],
    params: &[(&str, String)],
) -> Result<Url, MarketDataError> {
    let invalid =
        |reason: String| MarketDataError::upstream(provider, format!("Invalid URL {base_url}: {reason}"));

    let mut url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid("not a base URL".to_string()))?
        .pop_if_empty()
        .extend(segments);
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}

/// GETs `url` and decodes a JSON body.
///
/// Transport errors, non-success statuses and malformed bodies all surface
/// as [`MarketDataError::Upstream`].
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    provider: &'static str,
    url: Url,
    headers: HeaderMap,
) -> Result<T, MarketDataError> {
    debug!("Requesting {}", url);

    let response = client
        .get(url)
        .headers(headers)
        .send()
        .await
        .map_err(|e| MarketDataError::upstream(provider, format!("Request error: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(MarketDataError::http_status(
            provider,
            status.as_u16(),
            status.canonical_reason().unwrap_or("unexpected status"),
        ));
    }

    let text = response
        .text()
        .await
        .map_err(|e| MarketDataError::upstream(provider, format!("Failed to read body: {e}")))?;

    serde_json::from_str(&text).map_err(|e| {
        error!(error = ?e, response = %text, "Failed to parse {provider} response");
        MarketDataError::upstream(provider, format!("Failed to parse JSON response: {e}"))
    })
}

/// Orders by market cap, largest first, and keeps at most `limit` assets.
pub(crate) fn rank_by_market_cap(mut assets: Vec<Asset>, limit: usize) -> Vec<Asset> {
    assets.sort_by(|a, b| b.market_cap.total_cmp(&a.market_cap));
    assets.truncate(limit);
    assets
}

/// Grid step for a history request: hourly up to one day, daily beyond.
pub(crate) fn is_hourly(days: u32) -> bool {
    days <= 1
}
