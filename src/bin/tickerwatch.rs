use std::fs::OpenOptions;
use std::io::{self, IsTerminal};

use anyhow::Context;
use clap::Parser;
use log::{debug, info};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use tickerwatch::{
    cli::Args,
    controller::{Command, LoopError, LoopExit, RefreshLoop},
    input::spawn_keyboard,
    provider::YahooProvider,
    render::TerminalRenderer,
    services::PriceCache,
};

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.log_file)
        .with_context(|| format!("cannot open log file {}", args.log_file.display()))?;

    // The chart owns the terminal, so logs go to a file.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Toggles after the loop has exited do nothing; only quit is honoured.
async fn wait_for_quit(commands: &mut UnboundedReceiver<Command>) {
    while let Some(command) = commands.recv().await {
        match command {
            Command::Quit => break,
            Command::Toggle => debug!("toggle ignored, updates already stopped"),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        anyhow::bail!("tickerwatch needs an interactive terminal (TTY)");
    }

    let query = args.query()?;
    let provider =
        YahooProvider::new(args.provider_config()).context("failed to build http client")?;
    let cache = PriceCache::new(provider, args.ttl);
    info!("starting {query} with {:?} chart", args.chart);

    let terminal = ratatui::try_init().context("failed to set up terminal")?;
    let renderer = TerminalRenderer::new(terminal, args.chart);
    let mut refresh = RefreshLoop::new(query, cache, renderer, args.loop_config());

    let (tx, mut rx) = unbounded_channel();
    let keyboard = spawn_keyboard(tx);

    let result = match refresh.run_session(args.verify_symbol, &mut rx).await {
        LoopExit::Quit => Ok(()),
        LoopExit::Stopped => {
            wait_for_quit(&mut rx).await;
            Ok(())
        }
        LoopExit::Failed(err @ LoopError::Render(_)) => {
            // Leave the error on screen until the user quits.
            wait_for_quit(&mut rx).await;
            Err(err)
        }
        LoopExit::Failed(err) => Err(err),
    };

    keyboard.abort();
    ratatui::restore();
    info!("exiting");

    result.map_err(anyhow::Error::from)
}
