use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::controller::{LoopConfig, MAX_TICK, MIN_TICK};
use crate::models::{Interval, Period, Query, QueryError};
use crate::provider::yahoo::{YahooConfig, DEFAULT_BASE_URL};
use crate::render::ChartStyle;

const MIN_UPDATE_SECS: u64 = 1;
const MAX_UPDATE_SECS: u64 = 60;
const MAX_TTL: Duration = Duration::from_secs(24 * 3600);
const MIN_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Parser)]
#[command(author, version, about = "Live price chart for a ticker symbol", long_about = None)]
pub struct Args {
    /// Ticker symbol, e.g. AAPL, MSFT, GOOG.
    #[arg(default_value = "AAPL")]
    pub symbol: String,

    /// How often to refresh the chart (1s to 60s).
    #[arg(short, long = "update", value_parser = parse_update_interval, default_value = "5s")]
    pub update_interval: Duration,

    #[arg(short, long, value_enum, default_value = "1d")]
    pub period: Period,

    #[arg(short, long, value_enum, default_value = "1m")]
    pub interval: Interval,

    #[arg(short, long, value_enum, default_value = "line")]
    pub chart: ChartStyle,

    /// How long a fetched history is reused before asking the provider again (up to 24h).
    #[arg(long, value_parser = parse_ttl, default_value = "60s")]
    pub ttl: Duration,

    /// Polling granularity of the refresh loop (1ms to 60s).
    #[arg(long, value_parser = parse_tick, default_value = "1s")]
    pub tick: Duration,

    /// Look the symbol up before fetching history and stop if it is unknown.
    #[arg(long)]
    pub verify_symbol: bool,

    #[arg(long, env = "TICKERWATCH_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// HTTP request timeout (1s to 300s).
    #[arg(long, value_parser = parse_timeout, default_value = "10s")]
    pub timeout: Duration,

    #[arg(long, default_value = "tickerwatch.log")]
    pub log_file: PathBuf,
}

impl Args {
    pub fn query(&self) -> Result<Query, QueryError> {
        Query::new(&self.symbol, self.period, self.interval)
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            update_interval: self.update_interval,
            tick: self.tick,
        }
    }

    pub fn provider_config(&self) -> YahooConfig {
        YahooConfig::default()
            .with_base_url(self.base_url.clone())
            .with_timeout(self.timeout)
    }
}

/// Parses `250ms`, `30s`, `2m`, `1h` or bare seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let number = |digits: &str| u64::from_str(digits).map_err(|e| e.to_string());
    let too_large = || "duration too large".to_string();

    if let Some(stripped) = s.strip_suffix("ms") {
        return Ok(Duration::from_millis(number(stripped)?));
    }
    let secs = if let Some(stripped) = s.strip_suffix('s') {
        number(stripped)?
    } else if let Some(stripped) = s.strip_suffix('m') {
        number(stripped)?.checked_mul(60).ok_or_else(too_large)?
    } else if let Some(stripped) = s.strip_suffix('h') {
        number(stripped)?.checked_mul(3600).ok_or_else(too_large)?
    } else {
        u64::from_str(s)
            .map_err(|_| "Invalid duration format. Use formats like 1s, 3m, or 1h.".to_string())?
    };
    Ok(Duration::from_secs(secs))
}

fn parse_bounded(s: &str, what: &str, min: Duration, max: Duration) -> Result<Duration, String> {
    let duration = parse_duration(s)?;
    if duration < min || duration > max {
        return Err(format!("{what} must be between {min:?} and {max:?}"));
    }
    Ok(duration)
}

pub fn parse_update_interval(s: &str) -> Result<Duration, String> {
    parse_bounded(
        s,
        "update interval",
        Duration::from_secs(MIN_UPDATE_SECS),
        Duration::from_secs(MAX_UPDATE_SECS),
    )
}

pub fn parse_tick(s: &str) -> Result<Duration, String> {
    parse_bounded(s, "tick", MIN_TICK, MAX_TICK)
}

/// Zero is allowed and disables caching.
pub fn parse_ttl(s: &str) -> Result<Duration, String> {
    parse_bounded(s, "ttl", Duration::ZERO, MAX_TTL)
}

pub fn parse_timeout(s: &str) -> Result<Duration, String> {
    parse_bounded(s, "timeout", MIN_TIMEOUT, MAX_TIMEOUT)
}
