//! Ten-MCTS: command-line driver.
//!
//! ## Usage
//!
//! - `ten-mcts` - Play an engine-vs-engine demo match
//! - `ten-mcts selfplay --think-ms 200` - Same, with a custom think time
//! - `ten-mcts serve` - Answer JSON client moves on stdin/stdout
//!
//! Logs go to stderr; set `RUST_LOG` to change the level.

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ten_mcts::config::SearchConfig;
use ten_mcts::constants::{DEFAULT_THINK_MS, SELFPLAY_THINK_MS};
use ten_mcts::mcts::Searcher;
use ten_mcts::protocol::ProtocolServer;
use ten_mcts::selfplay::run_match;

/// Ten-MCTS: a time-bounded MCTS engine for 9-subboard tic-tac-toe
#[derive(Parser)]
#[command(name = "ten-mcts")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a full game between two copies of the engine
    Selfplay {
        /// Think time per move in milliseconds
        #[arg(long, default_value_t = SELFPLAY_THINK_MS)]
        think_ms: u64,
        /// Rollout threads (0 = one per core)
        #[arg(long, default_value_t = 0)]
        threads: usize,
        /// Seed for reproducible rollouts
        #[arg(long)]
        seed: Option<u64>,
        /// Only print the result
        #[arg(long)]
        quiet: bool,
    },
    /// Answer JSON client moves, one per line, on stdin/stdout
    Serve {
        /// Think time per reply in milliseconds
        #[arg(long, default_value_t = DEFAULT_THINK_MS)]
        think_ms: u64,
        /// Rollout threads (0 = one per core)
        #[arg(long, default_value_t = 0)]
        threads: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ten_mcts=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Serve { think_ms, threads }) => {
            let config = SearchConfig::default()
                .with_think_time(Duration::from_millis(think_ms))
                .with_threads(threads);
            serve(config)
        }
        Some(Commands::Selfplay {
            think_ms,
            threads,
            seed,
            quiet,
        }) => {
            let mut config = SearchConfig::default()
                .with_think_time(Duration::from_millis(think_ms))
                .with_threads(threads);
            config.seed = seed;
            run_demo(config, quiet)
        }
        None => {
            let config =
                SearchConfig::default().with_think_time(Duration::from_millis(SELFPLAY_THINK_MS));
            run_demo(config, false)
        }
    }
}

fn serve(config: SearchConfig) -> Result<()> {
    info!(
        think_ms = config.think_time.as_millis() as u64,
        "serving client moves on stdin"
    );
    let searcher = Searcher::new(config).context("failed to set up the searcher")?;
    let mut server = ProtocolServer::new(searcher);
    let stdin = io::stdin();
    server
        .run(stdin.lock(), io::stdout())
        .context("protocol I/O failed")
}

fn run_demo(config: SearchConfig, quiet: bool) -> Result<()> {
    println!(
        "Ten-MCTS: engine vs. engine, {} ms per move\n",
        config.think_time.as_millis()
    );
    let searcher = Searcher::new(config).context("failed to set up the searcher")?;

    let outcome = run_match(&searcher, |record| {
        if quiet {
            return;
        }
        println!(
            "Move {} by {}: {} (winning probability {}%, {} rollouts)",
            record.number, record.player, record.mv, record.win_percentage, record.root_visits
        );
        println!("{}\n", record.position);
    })
    .context("self-play search failed")?;

    if quiet {
        println!("{}", outcome.final_position);
    }
    println!("{} wins after {} moves.", outcome.winner, outcome.moves);
    Ok(())
}
