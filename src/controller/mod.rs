use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep_until, Instant};

use crate::models::{History, Query};
use crate::provider::{DataProvider, ProviderError};
use crate::render::{ChartFrame, Notice, RenderError, Renderer};
use crate::services::PriceCache;

pub const DEFAULT_TICK: Duration = Duration::from_secs(1);
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(5);
pub const MIN_TICK: Duration = Duration::from_millis(1);
pub const MAX_TICK: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Stopped,
}

impl RunState {
    pub fn toggled(self) -> Self {
        match self {
            RunState::Running => RunState::Stopped,
            RunState::Stopped => RunState::Running,
        }
    }

    pub fn is_running(self) -> bool {
        self == RunState::Running
    }
}

/// User input delivered to the loop between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Toggle,
    Quit,
}

/// Errors that end periodic updates for the session.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("Error fetching data for {symbol}: {detail}")]
    EmptyInitialFetch { symbol: String, detail: String },
    #[error("Error fetching data for {symbol}: {source}")]
    SymbolLookup {
        symbol: String,
        #[source]
        source: ProviderError,
    },
    #[error("An error occurred during data update: {0}")]
    Render(#[from] RenderError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Update interval has not elapsed since the last render.
    NotDue,
    Rendered,
    /// Fetch came back empty; the previous chart stays up.
    Stale,
}

#[derive(Debug)]
pub enum LoopExit {
    Stopped,
    Quit,
    Failed(LoopError),
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub update_interval: Duration,
    pub tick: Duration,
}

impl LoopConfig {
    /// The tick actually slept between iterations, kept within
    /// `MIN_TICK..=MAX_TICK`.
    pub fn effective_tick(&self) -> Duration {
        self.tick.clamp(MIN_TICK, MAX_TICK)
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_UPDATE_INTERVAL,
            tick: DEFAULT_TICK,
        }
    }
}

/// Drives wait -> fetch (through the cache) -> validate -> render for one
/// query until stopped.
pub struct RefreshLoop<P, R> {
    query: Query,
    config: LoopConfig,
    cache: PriceCache<P>,
    renderer: R,
    state: RunState,
    held: Option<Arc<History>>,
    display_name: Option<String>,
    last_render: Option<Instant>,
}

impl<P: DataProvider, R: Renderer> RefreshLoop<P, R> {
    pub fn new(query: Query, cache: PriceCache<P>, renderer: R, config: LoopConfig) -> Self {
        Self {
            query,
            config,
            cache,
            renderer,
            state: RunState::Running,
            held: None,
            display_name: None,
            last_render: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn toggle(&mut self) -> RunState {
        self.state = self.state.toggled();
        info!("run state -> {:?}", self.state);
        self.state
    }

    /// The last non-empty history this loop accepted.
    pub fn held(&self) -> Option<&History> {
        self.held.as_deref()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Asks the provider for the security's name before anything else runs.
    /// An unknown symbol is fatal.
    pub async fn verify_symbol(&mut self) -> Result<String, LoopError> {
        let symbol = self.query.symbol().to_string();
        match self.cache.provider().lookup(&symbol).await {
            Ok(name) => {
                info!("{symbol} resolved to {name:?}");
                self.display_name = Some(name.clone());
                Ok(name)
            }
            Err(source) => Err(LoopError::SymbolLookup { symbol, source }),
        }
    }

    /// Seeds the held history without rendering. An empty result is fatal.
    pub async fn initial_fetch(&mut self) -> Result<(), LoopError> {
        let history = self.cache.fetch_cached(&self.query).await;
        if history.is_empty() {
            let detail = self
                .cache
                .take_diagnostic()
                .unwrap_or_else(|| "no rows returned".to_string());
            return Err(LoopError::EmptyInitialFetch {
                symbol: self.query.symbol().to_string(),
                detail,
            });
        }
        info!("{}: initial fetch returned {} rows", self.query, history.table.len());
        self.held = Some(history);
        Ok(())
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_render {
            Some(last) => now.duration_since(last) >= self.config.update_interval,
            None => true,
        }
    }

    /// One unit of work: fetch if due, then render a non-empty result.
    ///
    /// A render failure flips the loop to `Stopped` and is returned; an empty
    /// fetch is not an error.
    pub async fn tick(&mut self) -> Result<TickOutcome, LoopError> {
        let now = Instant::now();
        if !self.is_due(now) {
            return Ok(TickOutcome::NotDue);
        }

        let history = self.cache.fetch_cached(&self.query).await;
        if history.is_empty() {
            let message = match self.cache.take_diagnostic() {
                Some(diagnostic) => diagnostic,
                None => {
                    warn!("{}: empty result, keeping last chart", self.query);
                    format!("No data for {}; showing last chart", self.query.symbol())
                }
            };
            self.surface(Notice::warning(message));
            return Ok(TickOutcome::Stale);
        }

        self.held = Some(history.clone());
        let name = self
            .display_name
            .as_deref()
            .unwrap_or(history.display_name.as_str());
        let frame = ChartFrame::new(
            &history.table,
            name,
            history.currency.as_deref(),
            &self.query,
        );
        if let Err(err) = self.renderer.render(&frame) {
            self.state = RunState::Stopped;
            return Err(LoopError::Render(err));
        }
        self.last_render = Some(now);

        if let Some(last) = history.table.last() {
            self.surface(Notice::info(format!(
                "{} rows, last close {:.2} at {}",
                history.table.len(),
                last.close,
                last.timestamp.format("%Y-%m-%d %H:%M UTC"),
            )));
        }
        Ok(TickOutcome::Rendered)
    }

    /// Ticks until the run state is `Stopped`, a quit command arrives, or a
    /// render fails. The run flag is checked once per tick; commands are
    /// applied while sleeping.
    pub async fn run(&mut self, commands: &mut UnboundedReceiver<Command>) -> LoopExit {
        info!(
            "refresh loop started for {} every {}s",
            self.query,
            self.config.update_interval.as_secs()
        );
        let mut commands_open = true;

        let exit = loop {
            if !self.state.is_running() {
                break LoopExit::Stopped;
            }

            match self.tick().await {
                Ok(outcome) => debug!("tick: {outcome:?}"),
                Err(err) => {
                    error!("{err}");
                    break LoopExit::Failed(err);
                }
            }

            let now = Instant::now();
            let deadline = now
                .checked_add(self.config.effective_tick())
                .unwrap_or(now);
            if self.wait_for_tick(deadline, commands, &mut commands_open).await {
                self.state = RunState::Stopped;
                break LoopExit::Quit;
            }
        };

        info!("updates stopped: {exit:?}");
        let notice = match &exit {
            LoopExit::Failed(err) => Notice::error(format!("{err}. Updates stopped.")),
            _ => Notice::info("Updates stopped. Press q to quit."),
        };
        self.surface(notice);
        exit
    }

    /// Verification (optional), initial fetch, then the loop. A failed
    /// start never enters the loop.
    pub async fn run_session(
        &mut self,
        verify_symbol: bool,
        commands: &mut UnboundedReceiver<Command>,
    ) -> LoopExit {
        if verify_symbol {
            if let Err(err) = self.verify_symbol().await {
                error!("{err}");
                return LoopExit::Failed(err);
            }
        }
        if let Err(err) = self.initial_fetch().await {
            error!("{err}");
            return LoopExit::Failed(err);
        }
        self.run(commands).await
    }

    /// Sleeps until `deadline`, applying toggles as they arrive. Returns
    /// true when a quit command was received.
    async fn wait_for_tick(
        &mut self,
        deadline: Instant,
        commands: &mut UnboundedReceiver<Command>,
        commands_open: &mut bool,
    ) -> bool {
        loop {
            if !*commands_open {
                sleep_until(deadline).await;
                return false;
            }
            tokio::select! {
                _ = sleep_until(deadline) => return false,
                command = commands.recv() => match command {
                    Some(Command::Toggle) => {
                        self.toggle();
                    }
                    Some(Command::Quit) => return true,
                    None => *commands_open = false,
                },
            }
        }
    }

    fn surface(&mut self, notice: Notice) {
        if let Err(err) = self.renderer.notice(notice) {
            error!("failed to show notice: {err}");
        }
    }
}
