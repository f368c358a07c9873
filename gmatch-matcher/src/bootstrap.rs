// Process startup helpers shared by both worker binaries

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Startup connection retries. Exhaustion is the fatal path: the binary
/// logs the final error and exits with code 1.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Run `attempt` up to `max_attempts` times with exponential backoff,
/// returning the last error once exhausted.
pub async fn with_retry<T, E, F, Fut>(
    what: &str,
    settings: &RetrySettings,
    mut attempt: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut delay = settings.initial_delay;

    for round in 1..=settings.max_attempts.max(1) {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if round == settings.max_attempts.max(1) => return Err(e),
            Err(e) => {
                warn!(
                    target = what,
                    attempt = round,
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "connection attempt failed"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(settings.max_delay);
            }
        }
    }

    unreachable!("retry loop returns on the final attempt")
}

/// Resolve on SIGINT or SIGTERM. Workers finish their current iteration and
/// exit at the next suspension point.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler, falling back to SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
        _ = term.recv() => info!("received SIGTERM"),
    }
}

#[cfg(not(unix))]
pub async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received interrupt");
}
