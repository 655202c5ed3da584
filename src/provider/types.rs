use chrono::DateTime;
use log::debug;
use serde::Deserialize;

use super::ProviderError;
use crate::models::{Candle, History, PriceTable};

#[derive(Deserialize, Debug)]
pub struct ChartEnvelope {
    pub chart: ChartBody,
}

#[derive(Deserialize, Debug)]
pub struct ChartBody {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
pub struct ChartError {
    pub code: String,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ChartResult {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: Option<String>,
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub currency: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Quote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

/// Decodes a chart API body into the first result, mapping the API's own
/// error object onto `ProviderError`.
pub fn parse_chart(body: &str, symbol: &str) -> Result<ChartResult, ProviderError> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    if let Some(error) = envelope.chart.error {
        return Err(match error.code.as_str() {
            "Not Found" => ProviderError::UnknownSymbol(symbol.to_string()),
            _ => ProviderError::Api(error.description.unwrap_or(error.code)),
        });
    }

    envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| ProviderError::UnknownSymbol(symbol.to_string()))
}

impl ChartResult {
    pub fn display_name(&self, symbol: &str) -> String {
        let non_blank = |name: &&str| !name.trim().is_empty();
        self.meta
            .long_name
            .as_deref()
            .filter(non_blank)
            .or_else(|| self.meta.short_name.as_deref().filter(non_blank))
            .unwrap_or(symbol)
            .to_string()
    }

    pub fn into_history(self, symbol: &str) -> History {
        let name = self.display_name(symbol);
        let quote = self.indicators.quote.into_iter().next().unwrap_or_default();

        let mut rows = Vec::with_capacity(self.timestamp.len());
        let mut dropped = 0;
        for (i, &ts) in self.timestamp.iter().enumerate() {
            let row = match (
                DateTime::from_timestamp(ts, 0),
                cell(&quote.open, i),
                cell(&quote.high, i),
                cell(&quote.low, i),
                cell(&quote.close, i),
            ) {
                (Some(timestamp), Some(open), Some(high), Some(low), Some(close)) => Candle {
                    timestamp,
                    open,
                    high,
                    low,
                    close,
                    volume: cell(&quote.volume, i).unwrap_or(0.0).max(0.0) as u64,
                },
                _ => {
                    dropped += 1;
                    continue;
                }
            };
            rows.push(row);
        }
        if dropped > 0 {
            debug!("{symbol}: dropped {dropped} incomplete rows");
        }

        let history = History::new(PriceTable::new(rows), name);
        match self.meta.currency {
            Some(currency) => history.with_currency(currency),
            None => history,
        }
    }
}

fn cell(column: &[Option<f64>], i: usize) -> Option<f64> {
    column.get(i).copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const AAPL_BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": {
                    "currency": "USD",
                    "symbol": "AAPL",
                    "longName": "Apple Inc.",
                    "shortName": "Apple",
                    "regularMarketPrice": 227.1
                },
                "timestamp": [1700000120, 1700000000, 1700000060],
                "indicators": {
                    "quote": [{
                        "open":   [227.5, 226.0, null],
                        "high":   [228.0, 226.9, 227.4],
                        "low":    [227.1, 225.8, 226.5],
                        "close":  [227.9, 226.7, 227.0],
                        "volume": [1200, 3400, 500]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_chart_builds_sorted_history() {
        let result = parse_chart(AAPL_BODY, "AAPL").unwrap();
        let history = result.into_history("AAPL");

        assert_eq!(history.display_name, "Apple Inc.");
        assert_eq!(history.currency.as_deref(), Some("USD"));

        // The row with a null open is dropped.
        let rows = history.table.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp.timestamp(), 1700000000);
        assert_eq!(rows[1].timestamp.timestamp(), 1700000120);
        assert_relative_eq!(rows[0].close, 226.7);
        assert_relative_eq!(rows[1].high, 228.0);
        assert_eq!(rows[0].volume, 3400);
    }

    #[test]
    fn test_not_found_maps_to_unknown_symbol() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        match parse_chart(body, "NOPE") {
            Err(ProviderError::UnknownSymbol(symbol)) => assert_eq!(symbol, "NOPE"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_other_api_errors_keep_description() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input - interval=1m is not supported for range=10y"}}}"#;
        match parse_chart(body, "AAPL") {
            Err(ProviderError::Api(message)) => assert!(message.contains("interval=1m")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_body_is_parse_error() {
        assert!(matches!(
            parse_chart("<html>too many requests</html>", "AAPL"),
            Err(ProviderError::Parse(_))
        ));
    }

    #[test]
    fn test_name_falls_back_to_short_name_then_symbol() {
        let body = r#"{"chart":{"result":[{"meta":{"shortName":"Microsoft"},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let result = parse_chart(body, "MSFT").unwrap();
        assert_eq!(result.display_name("MSFT"), "Microsoft");

        let body = r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[]}}],"error":null}}"#;
        let result = parse_chart(body, "XYZ").unwrap();
        let history = result.into_history("XYZ");
        assert_eq!(history.display_name, "XYZ");
        assert!(history.is_empty());
    }

    #[test]
    fn test_blank_long_name_falls_back_to_short_name() {
        let body = r#"{"chart":{"result":[{"meta":{"longName":"","shortName":"Microsoft"},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let result = parse_chart(body, "MSFT").unwrap();
        assert_eq!(result.display_name("MSFT"), "Microsoft");

        let body = r#"{"chart":{"result":[{"meta":{"longName":"  ","shortName":""},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let result = parse_chart(body, "MSFT").unwrap();
        assert_eq!(result.display_name("MSFT"), "MSFT");
    }
}
