// Edge calculator entry point

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use gmatch_cache::RedisCache;
use gmatch_config::load_config;
use gmatch_matcher::bootstrap::{self, RetrySettings};
use gmatch_matcher::EdgeCalculator;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "edge-calculator", about = "G-Match compatibility edge calculator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the polling worker
    Run {
        /// Process a single tick and exit
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    bootstrap::init_tracing();
    let cli = Cli::parse();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "fatal configuration error");
            return ExitCode::FAILURE;
        }
    };

    let io_timeout = Duration::from_secs(config.io_timeout_secs);
    let cache = match bootstrap::with_retry("cache", &RetrySettings::default(), || {
        RedisCache::connect(&config.redis.url, io_timeout)
    })
    .await
    {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            error!(error = %e, "cache unreachable after retries");
            return ExitCode::FAILURE;
        }
    };

    let calculator = EdgeCalculator::new(
        cache,
        Duration::from_secs(config.edge.poll_interval_secs),
        config.scheduler.mget_batch,
    );

    let Command::Run { once } = cli.command;
    if once {
        match calculator.run_once().await {
            Ok(stats) => {
                info!(
                    processed = stats.processed,
                    edges = stats.edges_created,
                    "tick complete"
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "tick failed");
                ExitCode::FAILURE
            }
        }
    } else {
        calculator.run(bootstrap::shutdown_signal()).await;
        ExitCode::SUCCESS
    }
}
