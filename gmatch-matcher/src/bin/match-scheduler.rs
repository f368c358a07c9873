// Match scheduler entry point

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use gmatch_cache::RedisCache;
use gmatch_config::load_config;
use gmatch_matcher::bootstrap::{self, RetrySettings};
use gmatch_matcher::{CycleOutcome, MatchScheduler};
use gmatch_notifier::MailNotifier;
use gmatch_store::PgStore;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "match-scheduler", about = "G-Match pairing scheduler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler loop
    Run {
        /// Execute a single cycle and exit
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
    let retry = RetrySettings::default();

    let cache = match bootstrap::with_retry("cache", &retry, || {
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

    let store = match bootstrap::with_retry("database", &retry, || {
        PgStore::connect(&config.database.url, io_timeout)
    })
    .await
    {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(error = %e, "database unreachable after retries");
            return ExitCode::FAILURE;
        }
    };

    let notifier = match MailNotifier::new(&config.email) {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            error!(error = %e, "fatal mail configuration error");
            return ExitCode::FAILURE;
        }
    };

    let scheduler = MatchScheduler::new(
        cache,
        store,
        notifier.clone(),
        config.scheduler.clone(),
    );

    let Command::Run { once } = cli.command;
    let code = if once {
        match scheduler.tick(chrono::Utc::now()).await {
            Ok(CycleOutcome::Completed(stats)) => {
                info!(
                    pairs = stats.pairs_committed,
                    expired = stats.expired,
                    "cycle complete"
                );
                ExitCode::SUCCESS
            }
            Ok(CycleOutcome::Skipped) => {
                info!("cycle skipped, lock held elsewhere");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "cycle failed");
                ExitCode::FAILURE
            }
        }
    } else {
        scheduler.run(bootstrap::shutdown_signal()).await;
        ExitCode::SUCCESS
    };

    // Drain pending notifications before the process exits.
    notifier.shutdown().await;
    code
}
