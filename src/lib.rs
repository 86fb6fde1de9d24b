pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::{FailoverClient, TimeRange};
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Top {
        limit: usize,
    },
    Search {
        query: String,
    },
    History {
        asset_id: String,
        range: TimeRange,
    },
    Portfolio {
        total_value: f64,
        allocations: Vec<(String, f64)>,
        range: TimeRange,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Coinfolio starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let client = FailoverClient::from_config(&config);
    debug!(providers = ?client.provider_names(), "Market data providers ready");

    match command {
        AppCommand::Top { limit } => cli::market::show_top_assets(&client, limit).await,
        AppCommand::Search { query } => cli::market::show_search(&client, &query).await,
        AppCommand::History { asset_id, range } => {
            cli::market::show_history(&client, &asset_id, range).await
        }
        AppCommand::Portfolio {
            total_value,
            allocations,
            range,
        } => cli::portfolio::show_portfolio(&client, &allocations, total_value, range).await,
    }
}
