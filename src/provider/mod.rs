pub mod types;
pub mod yahoo;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{History, Interval, Period, Query};

pub use yahoo::{YahooConfig, YahooProvider};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("rate limited by provider")]
    RateLimited,
    #[error("provider api error: {0}")]
    Api(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

/// Source of price history for a ticker.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn fetch(&self, query: &Query) -> Result<History, ProviderError>;

    /// Resolves the display name of a security, failing for symbols the
    /// provider does not know.
    async fn lookup(&self, symbol: &str) -> Result<String, ProviderError> {
        let query = Query::new(symbol, Period::OneDay, Interval::OneDay)
            .map_err(|_| ProviderError::UnknownSymbol(symbol.to_string()))?;
        let history = self.fetch(&query).await?;
        Ok(history.display_name)
    }
}
