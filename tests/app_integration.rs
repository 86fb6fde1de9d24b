use coinfolio::core::config::AppConfig;
use coinfolio::core::{FailoverClient, MarketDataError, TimeRange};
use std::fs;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_failing_server(status: u16) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&mock_server)
            .await;
        mock_server
    }

    pub async fn create_coincap_server() -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/assets"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"data": [
                    {"id": "bitcoin", "symbol": "BTC", "name": "Bitcoin", "priceUsd": "45000",
                     "marketCapUsd": "880000000000", "changePercent24Hr": "10"},
                    {"id": "ethereum", "symbol": "ETH", "name": "Ethereum", "priceUsd": "3000",
                     "marketCapUsd": "360000000000", "changePercent24Hr": "-10"}
                ]}"#,
            ))
            .mount(&mock_server)
            .await;

        for (id, prices) in [("bitcoin", [40000.0, 44000.0]), ("ethereum", [2000.0, 1800.0])] {
            let body = format!(
                r#"{{"data": [
                    {{"priceUsd": "{}", "time": 1704067200000}},
                    {{"priceUsd": "{}", "time": 1704153600000}}
                ]}}"#,
                prices[0], prices[1]
            );
            Mock::given(method("GET"))
                .and(path(format!("/v2/assets/{id}/history")))
                .respond_with(ResponseTemplate::new(200).set_body_string(body))
                .mount(&mock_server)
                .await;
        }

        mock_server
    }

    pub fn config_yaml(coingecko: &str, coincap: &str, coinmarketcap: &str) -> String {
        format!(
            r#"
providers:
  coingecko:
    base_url: "{coingecko}"
  coincap:
    base_url: "{coincap}"
  coinmarketcap:
    base_url: "{coinmarketcap}"
failover:
  retry_delay_ms: 0
"#
        )
    }
}

#[test_log::test(tokio::test)]
async fn test_fails_over_to_coincap_when_coingecko_is_down() {
    let coingecko = test_utils::create_failing_server(500).await;
    let coincap = test_utils::create_coincap_server().await;
    let coinmarketcap = test_utils::create_failing_server(401).await;

    let yaml = test_utils::config_yaml(&coingecko.uri(), &coincap.uri(), &coinmarketcap.uri());
    let config: AppConfig = serde_yaml::from_str(&yaml).expect("Failed to parse config");
    let client = FailoverClient::from_config(&config);

    let assets = client.get_top_assets(10).await.expect("Failover should succeed");
    info!(?assets, "Fetched top assets");

    assert_eq!(assets.len(), 2);
    assert_eq!(assets[0].id, "bitcoin");
    assert_eq!(client.failed_providers(), vec!["coingecko"]);

    // coingecko stays skipped for other operations until the reset
    let series = client.get_price_history("bitcoin", 7).await.unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(coingecko.received_requests().await.unwrap().len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_all_providers_down_is_terminal() {
    let coingecko = test_utils::create_failing_server(500).await;
    let coincap = test_utils::create_failing_server(503).await;
    let coinmarketcap = test_utils::create_failing_server(401).await;

    let yaml = test_utils::config_yaml(&coingecko.uri(), &coincap.uri(), &coinmarketcap.uri());
    let config: AppConfig = serde_yaml::from_str(&yaml).unwrap();
    let client = FailoverClient::from_config(&config);

    let err = client.get_top_assets(10).await.unwrap_err();

    assert!(matches!(err, MarketDataError::AllProvidersFailed { .. }));
    assert!(matches!(
        err.last_cause(),
        Some(MarketDataError::Upstream {
            provider: "coinmarketcap",
            status: Some(401),
            ..
        })
    ));
    assert_eq!(
        client.failed_providers(),
        vec!["coingecko", "coincap", "coinmarketcap"]
    );
}

#[test_log::test(tokio::test)]
async fn test_portfolio_report_through_failover() {
    use coinfolio::cli::portfolio::build_report;

    let coingecko = test_utils::create_failing_server(429).await;
    let coincap = test_utils::create_coincap_server().await;
    let coinmarketcap = test_utils::create_failing_server(401).await;

    let yaml = test_utils::config_yaml(&coingecko.uri(), &coincap.uri(), &coinmarketcap.uri());
    let config: AppConfig = serde_yaml::from_str(&yaml).unwrap();
    let client = FailoverClient::from_config(&config);
    let allocations = vec![("bitcoin".to_string(), 50.0), ("ethereum".to_string(), 50.0)];

    let report = build_report(&client, &allocations, 10000.0, TimeRange::SevenDays, &|| ())
        .await
        .expect("Report should build");

    assert_eq!(report.holdings.len(), 2);
    assert_eq!(report.chart.len(), 2);
    // bitcoin +10%, ethereum -10%
    assert!(report.metrics.total_return_percentage.abs() < 1e-9);
    assert!((report.metrics.volatility - 10.0).abs() < 1e-9);
    // 40000 * 0.5 * (5000 / 45000) + 2000 * 0.5 * (5000 / 3000)
    let expected = 40000.0 * 0.5 * (5000.0 / 45000.0) + 2000.0 * 0.5 * (5000.0 / 3000.0);
    assert!((report.chart[0].portfolio_value.unwrap() - expected).abs() < 1e-6);
    assert!(report.warnings.is_empty());
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let coingecko = test_utils::create_failing_server(500).await;
    let coincap = test_utils::create_coincap_server().await;
    let coinmarketcap = test_utils::create_failing_server(401).await;

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_path = config_file.path();
    fs::write(
        config_path,
        test_utils::config_yaml(&coingecko.uri(), &coincap.uri(), &coinmarketcap.uri()),
    )
    .expect("Failed to write config file");
    let config_path = config_path.to_str().unwrap();

    for command in [
        coinfolio::AppCommand::Top { limit: 5 },
        coinfolio::AppCommand::History {
            asset_id: "bitcoin".to_string(),
            range: TimeRange::SevenDays,
        },
        coinfolio::AppCommand::Portfolio {
            total_value: 10000.0,
            allocations: vec![("bitcoin".to_string(), 60.0), ("ethereum".to_string(), 30.0)],
            range: TimeRange::ThirtyDays,
        },
    ] {
        let result = coinfolio::run_command(command, Some(config_path)).await;
        assert!(result.is_ok(), "Command failed with: {:?}", result.err());
    }
}

#[test_log::test(tokio::test)]
async fn test_search_surfaces_terminal_failure() {
    let coingecko = test_utils::create_failing_server(500).await;
    let coincap = test_utils::create_failing_server(500).await;
    let coinmarketcap = test_utils::create_failing_server(401).await;

    let config_file = tempfile::NamedTempFile::new().unwrap();
    fs::write(
        config_file.path(),
        test_utils::config_yaml(&coingecko.uri(), &coincap.uri(), &coinmarketcap.uri()),
    )
    .unwrap();

    let result = coinfolio::run_command(
        coinfolio::AppCommand::Search {
            query: "bit".to_string(),
        },
        Some(config_file.path().to_str().unwrap()),
    )
    .await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("Search for 'bit' failed"));
    let cause = err.downcast_ref::<MarketDataError>().unwrap();
    assert!(cause.last_cause().unwrap().is_unsupported());
}
