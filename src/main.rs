use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use coinfolio::core::TimeRange;
use coinfolio::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the largest assets by market cap
    Top {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Search assets by name or symbol
    Search { query: String },
    /// Show the price history of one asset
    History {
        asset_id: String,
        /// One of 1D, 7D, 30D, 90D, 1Y
        #[arg(short, long, default_value = "7D")]
        range: TimeRange,
    },
    /// Compute value, return and volatility of a portfolio
    Portfolio {
        /// Total portfolio value in USD
        #[arg(short, long, default_value_t = 10000.0)]
        total: f64,
        /// Holding as id=allocation, e.g. bitcoin=60
        #[arg(short, long = "asset", value_parser = parse_allocation)]
        assets: Vec<(String, f64)>,
        /// One of 1D, 7D, 30D, 90D, 1Y
        #[arg(short, long, default_value = "7D")]
        range: TimeRange,
    },
}

impl From<Commands> for coinfolio::AppCommand {
    fn from(cmd: Commands) -> coinfolio::AppCommand {
        match cmd {
            Commands::Top { limit } => coinfolio::AppCommand::Top { limit },
            Commands::Search { query } => coinfolio::AppCommand::Search { query },
            Commands::History { asset_id, range } => {
                coinfolio::AppCommand::History { asset_id, range }
            }
            Commands::Portfolio {
                total,
                assets,
                range,
            } => coinfolio::AppCommand::Portfolio {
                total_value: total,
                allocations: assets,
                range,
            },
        }
    }
}

fn parse_allocation(value: &str) -> Result<(String, f64)> {
    let (id, allocation) = value
        .split_once('=')
        .with_context(|| format!("Expected id=allocation, got '{value}'"))?;
    let allocation = allocation
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Invalid allocation for '{id}'"))?;
    Ok((id.trim().to_lowercase(), allocation))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(cmd) => coinfolio::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
