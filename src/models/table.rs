use super::Candle;

/// Ordered price rows, ascending by timestamp. An empty table means the
/// fetch failed or the provider had nothing for the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    rows: Vec<Candle>,
}

impl PriceTable {
    pub fn new(mut rows: Vec<Candle>) -> Self {
        rows.sort_by_key(|row| row.timestamp);
        Self { rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Candle] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.rows.first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.rows.last()
    }

    /// Lowest low and highest high across all rows.
    pub fn price_range(&self) -> Option<(f64, f64)> {
        if self.rows.is_empty() {
            return None;
        }
        let low = self.rows.iter().fold(f64::INFINITY, |a, c| a.min(c.low));
        let high = self.rows.iter().fold(f64::NEG_INFINITY, |a, c| a.max(c.high));
        Some((low, high))
    }
}

/// A price table together with what the provider told us about the security.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    pub table: PriceTable,
    pub display_name: String,
    pub currency: Option<String>,
}

impl History {
    pub fn new(table: PriceTable, display_name: impl Into<String>) -> Self {
        Self {
            table,
            display_name: display_name.into(),
            currency: None,
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Placeholder handed out when a fetch fails.
    pub fn empty(symbol: &str) -> Self {
        Self::new(PriceTable::empty(), symbol)
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candle(secs: i64, low: f64, high: f64) -> Candle {
        Candle {
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            open: low,
            high,
            low,
            close: high,
            volume: 100,
        }
    }

    #[test]
    fn test_rows_sorted_by_timestamp() {
        let table = PriceTable::new(vec![candle(300, 1.0, 2.0), candle(100, 1.0, 2.0), candle(200, 1.0, 2.0)]);

        let stamps: Vec<i64> = table.rows().iter().map(|c| c.timestamp.timestamp()).collect();
        assert_eq!(stamps, vec![100, 200, 300]);
    }

    #[test]
    fn test_price_range() {
        let table = PriceTable::new(vec![candle(1, 10.0, 12.0), candle(2, 9.5, 11.0), candle(3, 10.5, 13.25)]);
        assert_eq!(table.price_range(), Some((9.5, 13.25)));
        assert_eq!(PriceTable::empty().price_range(), None);
    }

    #[test]
    fn test_empty_history_uses_symbol_as_name() {
        let history = History::empty("MSFT");
        assert!(history.is_empty());
        assert_eq!(history.display_name, "MSFT");
        assert_eq!(history.currency, None);
    }
}
