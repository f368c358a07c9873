// Configuration schema and types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level configuration shared by both worker binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    #[serde(default)]
    pub redis: RedisSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub edge: EdgeSection,
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub email: EmailSection,
    /// Deadline applied to every cache and database call, in seconds.
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            redis: RedisSection::default(),
            database: DatabaseSection::default(),
            edge: EdgeSection::default(),
            scheduler: SchedulerSection::default(),
            email: EmailSection::default(),
            io_timeout_secs: default_io_timeout_secs(),
        }
    }
}

fn default_io_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSection {
    #[serde(default = "default_redis_url")]
    pub url: String,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

impl Default for RedisSection {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    "postgres://localhost/gmatch".to_string()
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSection {
    /// Edge calculator tick, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    10
}

impl Default for EdgeSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSection {
    /// Scheduler tick, in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Minimum compatibility score admitted to the greedy step.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
    /// When set, an edge whose endpoints reach `priority_bypass` is admitted
    /// even below the threshold.
    #[serde(default)]
    pub priority_bypass_enabled: bool,
    #[serde(default = "default_priority_bypass")]
    pub priority_bypass: u32,
    /// Queue-entry TTL, in seconds.
    #[serde(default = "default_expire_after_secs")]
    pub expire_after_secs: u64,
    /// Leadership lock TTL, in seconds.
    #[serde(default = "default_lock_expire_secs")]
    pub lock_expire_secs: u64,
    /// Maximum keys per batched cache read.
    #[serde(default = "default_mget_batch")]
    pub mget_batch: usize,
}

fn default_interval_secs() -> u64 {
    300
}

fn default_match_threshold() -> f64 {
    80.0
}

fn default_priority_bypass() -> u32 {
    10
}

fn default_expire_after_secs() -> u64 {
    86_400
}

fn default_lock_expire_secs() -> u64 {
    120
}

fn default_mget_batch() -> usize {
    500
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            match_threshold: default_match_threshold(),
            priority_bypass_enabled: false,
            priority_bypass: default_priority_bypass(),
            expire_after_secs: default_expire_after_secs(),
            lock_expire_secs: default_lock_expire_secs(),
            mget_batch: default_mget_batch(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSection {
    #[serde(default = "default_email_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default)]
    pub smtp_user: String,
    #[serde(default)]
    pub smtp_password: String,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    /// Capacity of the outgoing notification queue; the oldest event is
    /// dropped on overflow.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_email_enabled() -> bool {
    true
}

fn default_from_address() -> String {
    "noreply@g-match.org".to_string()
}

fn default_frontend_url() -> String {
    "https://www.g-match.org".to_string()
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for EmailSection {
    fn default() -> Self {
        Self {
            enabled: default_email_enabled(),
            smtp_host: String::new(),
            smtp_user: String::new(),
            smtp_password: String::new(),
            from_address: default_from_address(),
            frontend_url: default_frontend_url(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Configuration errors. Any of these at startup is fatal: the binary logs
/// the error and exits with code 1.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid configuration: {0}")]
    Validation(String),
}
