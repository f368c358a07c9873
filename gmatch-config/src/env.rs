// Environment variable overrides
//
// Every deployment option is reachable as GMATCH_<SECTION>_<KEY>, e.g.
//   GMATCH_REDIS_URL=redis://cache:6379/0
//   GMATCH_SCHEDULER_INTERVAL_SECS=60
//   GMATCH_MATCH_THRESHOLD=70.0
//   GMATCH_EMAIL_ENABLED=false

use std::env;
use std::str::FromStr;

use crate::schema::{ConfigError, MatcherConfig};

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse::<T>()
        .map_err(|_| ConfigError::Validation(format!("invalid {}: {}", name, value)))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Validation(format!(
            "invalid {}: {} (expected true/false)",
            name, value
        ))),
    }
}

/// Apply `GMATCH_*` environment overrides on top of `config`.
pub fn apply_env_overrides(config: &mut MatcherConfig) -> Result<(), ConfigError> {
    if let Ok(v) = env::var("GMATCH_REDIS_URL") {
        config.redis.url = v;
    }
    if let Ok(v) = env::var("GMATCH_DATABASE_URL") {
        config.database.url = v;
    }

    if let Ok(v) = env::var("GMATCH_EDGE_POLL_INTERVAL_SECS") {
        config.edge.poll_interval_secs = parse_var("GMATCH_EDGE_POLL_INTERVAL_SECS", &v)?;
    }

    if let Ok(v) = env::var("GMATCH_SCHEDULER_INTERVAL_SECS") {
        config.scheduler.interval_secs = parse_var("GMATCH_SCHEDULER_INTERVAL_SECS", &v)?;
    }
    if let Ok(v) = env::var("GMATCH_MATCH_THRESHOLD") {
        config.scheduler.match_threshold = parse_var("GMATCH_MATCH_THRESHOLD", &v)?;
    }
    if let Ok(v) = env::var("GMATCH_PRIORITY_BYPASS_ENABLED") {
        config.scheduler.priority_bypass_enabled = parse_bool("GMATCH_PRIORITY_BYPASS_ENABLED", &v)?;
    }
    if let Ok(v) = env::var("GMATCH_PRIORITY_BYPASS") {
        config.scheduler.priority_bypass = parse_var("GMATCH_PRIORITY_BYPASS", &v)?;
    }
    if let Ok(v) = env::var("GMATCH_EXPIRE_AFTER_SECS") {
        config.scheduler.expire_after_secs = parse_var("GMATCH_EXPIRE_AFTER_SECS", &v)?;
    }
    if let Ok(v) = env::var("GMATCH_LOCK_EXPIRE_SECS") {
        config.scheduler.lock_expire_secs = parse_var("GMATCH_LOCK_EXPIRE_SECS", &v)?;
    }
    if let Ok(v) = env::var("GMATCH_MGET_BATCH") {
        config.scheduler.mget_batch = parse_var("GMATCH_MGET_BATCH", &v)?;
    }

    if let Ok(v) = env::var("GMATCH_EMAIL_ENABLED") {
        config.email.enabled = parse_bool("GMATCH_EMAIL_ENABLED", &v)?;
    }
    if let Ok(v) = env::var("GMATCH_SMTP_HOST") {
        config.email.smtp_host = v;
    }
    if let Ok(v) = env::var("GMATCH_SMTP_USER") {
        config.email.smtp_user = v;
    }
    if let Ok(v) = env::var("GMATCH_SMTP_PASSWORD") {
        config.email.smtp_password = v;
    }
    if let Ok(v) = env::var("GMATCH_FROM_ADDRESS") {
        config.email.from_address = v;
    }
    if let Ok(v) = env::var("GMATCH_FRONTEND_URL") {
        config.email.frontend_url = v;
    }
    if let Ok(v) = env::var("GMATCH_EMAIL_QUEUE_CAPACITY") {
        config.email.queue_capacity = parse_var("GMATCH_EMAIL_QUEUE_CAPACITY", &v)?;
    }

    if let Ok(v) = env::var("GMATCH_IO_TIMEOUT_SECS") {
        config.io_timeout_secs = parse_var("GMATCH_IO_TIMEOUT_SECS", &v)?;
    }

    Ok(())
}
