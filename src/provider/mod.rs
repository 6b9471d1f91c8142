//! Market-data capability provider.
//!
//! The server core treats market data as an external capability reached
//! through [`MarketDataProvider`]. The trait has one method per
//! market-data tool; implementations own all upstream concerns (HTTP,
//! retries, response decoding). The core's only obligations are to pass
//! validated arguments in and to normalise [`ProviderContent`] out.

mod eastmoney;

pub use eastmoney::EastMoneyProvider;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// One element of a provider result.
///
/// Providers return heterogeneous content; the two shapes are modelled
/// explicitly so the invoker can normalise each with a total conversion
/// instead of attribute probing.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderContent {
    /// Pre-formatted text content.
    Text {
        /// The text payload.
        text: String,
    },
    /// Arbitrary structured content, coerced to text at the wire boundary.
    Value(Value),
}

impl ProviderContent {
    /// Creates a text content element.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Errors raised by a capability provider.
///
/// These never cross the invoker boundary as protocol errors; the invoker
/// recovers them into displayable failure text.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// A request failed after exhausting all retry attempts.
    #[error("request to {url} failed after {attempts} attempts: {source}")]
    Http {
        /// The upstream URL.
        url: String,
        /// Attempts made before giving up.
        attempts: u32,
        /// The final transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The upstream answered with a shape this provider cannot decode.
    #[error("unexpected response from {url}: {message}")]
    Decode {
        /// The upstream URL.
        url: String,
        /// What was wrong with the payload.
        message: String,
    },
}

/// Data period for historical quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Daily bars.
    Daily,
    /// Weekly bars.
    Weekly,
    /// Monthly bars.
    Monthly,
}

impl Period {
    /// Parses the wire spelling of a period. Exact match, lowercase.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }

    /// The wire spelling of this period.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// The kline period code used by the quote endpoint.
    const fn kline_code(self) -> &'static str {
        match self {
            Self::Daily => "101",
            Self::Weekly => "102",
            Self::Monthly => "103",
        }
    }
}

/// Result type for provider calls.
pub type ProviderResult = Result<Vec<ProviderContent>, ProviderError>;

/// The uniform capability interface for market data.
///
/// A "not found" answer is ordinary content, not an error; errors are
/// reserved for transport and decoding failures.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Latest quote for a stock symbol. An empty symbol is answered with
    /// a hint rather than a full-market dump.
    async fn stock_spot(&self, symbol: &str) -> ProviderResult;

    /// Historical bars for a stock symbol at the given period.
    async fn stock_history(&self, symbol: &str, period: Period) -> ProviderResult;

    /// Open-fund valuation for a fund code.
    async fn fund_info(&self, symbol: &str) -> ProviderResult;

    /// Index quotes. An empty symbol returns the major indices.
    async fn index_data(&self, symbol: &str) -> ProviderResult;

    /// Futures quotes. An empty symbol returns the main contracts.
    async fn futures_data(&self, symbol: &str) -> ProviderResult;
}
