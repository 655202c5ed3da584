use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode, Url};

use super::types::{parse_chart, ChartResult};
use super::{DataProvider, ProviderError};
use crate::models::{History, Query};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) tickerwatch/0.1";

#[derive(Debug, Clone)]
pub struct YahooConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl YahooConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Price history from the Yahoo Finance chart endpoint.
#[derive(Debug, Clone)]
pub struct YahooProvider {
    http: Client,
    base_url: Url,
}

impl YahooProvider {
    pub fn new(config: YahooConfig) -> Result<Self, ProviderError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ProviderError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::InvalidUrl(config.base_url));
        }
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, base_url })
    }

    /// The symbol is appended as one percent-encoded path segment.
    fn chart_url(&self, symbol: &str) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart"])
            .push(symbol);
        Ok(url)
    }

    async fn chart(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<ChartResult, ProviderError> {
        let url = self.chart_url(symbol)?;
        debug!("GET {url} range={range} interval={interval}");

        let response = self
            .http
            .get(url)
            .query(&[
                ("range", range),
                ("interval", interval),
                ("includePrePost", "false"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        classify(status, &body, symbol)
    }
}

/// Maps a chart response to a result. Error statuses usually carry a
/// `chart.error` object; the status line is the fallback when they don't.
fn classify(status: StatusCode, body: &str, symbol: &str) -> Result<ChartResult, ProviderError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited);
    }
    match parse_chart(body, symbol) {
        Err(ProviderError::Parse(_)) if status == StatusCode::NOT_FOUND => {
            Err(ProviderError::UnknownSymbol(symbol.to_string()))
        }
        Err(ProviderError::Parse(_)) if !status.is_success() => {
            Err(ProviderError::Api(format!("http status {status}")))
        }
        other => other,
    }
}

#[async_trait]
impl DataProvider for YahooProvider {
    async fn fetch(&self, query: &Query) -> Result<History, ProviderError> {
        let result = self
            .chart(query.symbol(), query.period.as_str(), query.interval.as_str())
            .await?;
        let history = result.into_history(query.symbol());
        debug!("{query}: {} rows", history.table.len());
        Ok(history)
    }

    async fn lookup(&self, symbol: &str) -> Result<String, ProviderError> {
        let result = self.chart(symbol, "1d", "1d").await?;
        Ok(result.display_name(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base_url: &str) -> YahooProvider {
        YahooProvider::new(YahooConfig::default().with_base_url(base_url)).unwrap()
    }

    #[test]
    fn test_chart_url_trims_trailing_slash() {
        assert_eq!(
            provider("http://localhost:9000/").chart_url("AAPL").unwrap().as_str(),
            "http://localhost:9000/v8/finance/chart/AAPL"
        );
        assert_eq!(
            provider("http://localhost:9000/proxy/").chart_url("AAPL").unwrap().as_str(),
            "http://localhost:9000/proxy/v8/finance/chart/AAPL"
        );
    }

    #[test]
    fn test_chart_url_encodes_symbol() {
        let provider = provider(DEFAULT_BASE_URL);
        assert_eq!(
            provider.chart_url("BRK/B").unwrap().as_str(),
            "https://query1.finance.yahoo.com/v8/finance/chart/BRK%2FB"
        );
        assert_eq!(
            provider.chart_url("A B").unwrap().path(),
            "/v8/finance/chart/A%20B"
        );
        assert_eq!(
            provider.chart_url("X?range=max#").unwrap().path(),
            "/v8/finance/chart/X%3Frange=max%23"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = YahooProvider::new(YahooConfig::default().with_base_url("not a url"));
        assert!(matches!(result, Err(ProviderError::InvalidUrl(_))));
        let result = YahooProvider::new(YahooConfig::default().with_base_url("mailto:x@example.com"));
        assert!(matches!(result, Err(ProviderError::InvalidUrl(_))));
    }

    #[test]
    fn test_classify_rate_limited() {
        let result = classify(StatusCode::TOO_MANY_REQUESTS, "Too Many Requests", "AAPL");
        assert!(matches!(result, Err(ProviderError::RateLimited)));
    }

    #[test]
    fn test_classify_not_found_without_chart_body() {
        let result = classify(StatusCode::NOT_FOUND, "<html>Not Found</html>", "ZZZZ");
        assert!(matches!(result, Err(ProviderError::UnknownSymbol(s)) if s == "ZZZZ"));
    }

    #[test]
    fn test_classify_error_status_without_chart_body() {
        let result = classify(StatusCode::BAD_GATEWAY, "upstream down", "AAPL");
        match result {
            Err(ProviderError::Api(message)) => assert!(message.contains("502")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_classify_error_status_prefers_chart_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let result = classify(StatusCode::NOT_FOUND, body, "ZZZZ");
        assert!(matches!(result, Err(ProviderError::UnknownSymbol(_))));
    }

    #[test]
    fn test_classify_success() {
        let body = r#"{"chart":{"result":[{"meta":{"symbol":"AAPL","longName":"Apple Inc.","currency":"USD"},"timestamp":[1700000000],"indicators":{"quote":[{"open":[1.0],"high":[2.0],"low":[0.5],"close":[1.5],"volume":[100]}]}}],"error":null}}"#;
        let result = classify(StatusCode::OK, body, "AAPL").unwrap();
        assert_eq!(result.display_name("AAPL"), "Apple Inc.");
        assert_eq!(result.into_history("AAPL").table.len(), 1);
    }

    #[test]
    fn test_default_config() {
        let config = YahooConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }
}
