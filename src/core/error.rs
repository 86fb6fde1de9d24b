//! Error taxonomy for market data access.

use std::fmt::{Display, Formatter};
use thiserror::Error;

/// One logical market data operation, used for routing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    TopAssets,
    Search,
    PriceHistory,
    AssetsByIds,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TopAssets => "top assets",
            Self::Search => "search",
            Self::PriceHistory => "price history",
            Self::AssetsByIds => "assets by ids",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum MarketDataError {
    /// Transport failure, non-success status or an undecodable body.
    #[error("{provider} request failed{}: {message}", describe_status(.status))]
    Upstream {
        provider: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// The provider deliberately does not implement this capability.
    #[error("{provider} does not support {operation}")]
    UnsupportedOperation {
        provider: &'static str,
        operation: Operation,
    },

    #[error("all market data providers failed: {}", describe_last(.last))]
    AllProvidersFailed {
        #[source]
        last: Option<Box<MarketDataError>>,
    },
}

impl MarketDataError {
    pub fn upstream(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream {
            provider,
            status: None,
            message: message.into(),
        }
    }

    pub fn http_status(provider: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            provider,
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn unsupported(provider: &'static str, operation: Operation) -> Self {
        Self::UnsupportedOperation {
            provider,
            operation,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation { .. })
    }

    /// The underlying provider error carried by a terminal failure.
    pub fn last_cause(&self) -> Option<&MarketDataError> {
        match self {
            Self::AllProvidersFailed { last } => last.as_deref(),
            _ => None,
        }
    }
}

fn describe_status(status: &Option<u16>) -> String {
    status.map_or_else(String::new, |code| format!(" with HTTP {code}"))
}

fn describe_last(last: &Option<Box<MarketDataError>>) -> String {
    last.as_ref()
        .map_or_else(|| "no provider was attempted".to_string(), |e| e.to_string())
}
