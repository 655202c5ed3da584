pub mod candles;
pub mod terminal;

use clap::ValueEnum;
use thiserror::Error;

use crate::models::{History, PriceTable, Query};

pub use terminal::TerminalRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ChartStyle {
    /// Close prices as a line.
    #[default]
    Line,
    /// OHLC candlesticks.
    #[value(name = "candle")]
    Candlestick,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("terminal io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot plot table: {0}")]
    InvalidData(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// One line of user-facing status text.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Everything a renderer needs for one redraw of the chart slot.
#[derive(Debug, Clone)]
pub struct ChartFrame<'a> {
    pub table: &'a PriceTable,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub intraday: bool,
}

impl<'a> ChartFrame<'a> {
    pub fn new(table: &'a PriceTable, name: &str, currency: Option<&str>, query: &Query) -> Self {
        Self {
            table,
            title: format!(
                "{} ({}) Price - Period: {}",
                name,
                query.symbol(),
                query.period
            ),
            x_label: "Time".to_string(),
            y_label: format!("Stock Price ({})", currency.unwrap_or("USD")),
            intraday: query.interval.is_intraday(),
        }
    }

    pub fn for_history(history: &'a History, query: &Query) -> Self {
        Self::new(
            &history.table,
            &history.display_name,
            history.currency.as_deref(),
            query,
        )
    }
}

/// The single display slot plus its status line.
pub trait Renderer {
    /// Replaces whatever chart is currently shown.
    fn render(&mut self, frame: &ChartFrame<'_>) -> Result<(), RenderError>;

    fn notice(&mut self, notice: Notice) -> Result<(), RenderError>;
}

/// Rejects tables that cannot be drawn.
pub fn validate(table: &PriceTable) -> Result<(), RenderError> {
    if table.is_empty() {
        return Err(RenderError::InvalidData("no rows".to_string()));
    }
    if let Some(row) = table.rows().iter().find(|row| !row.is_finite()) {
        return Err(RenderError::InvalidData(format!(
            "non-finite price at {}",
            row.timestamp
        )));
    }
    Ok(())
}
