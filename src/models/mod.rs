pub mod candle;
pub mod query;
pub mod table;

pub use candle::Candle;
pub use query::{normalize_symbol, Interval, Period, Query, QueryError};
pub use table::{History, PriceTable};
