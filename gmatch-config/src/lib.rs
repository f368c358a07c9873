// gmatch-config - Configuration Management
// Defaults < optional TOML file < GMATCH_* environment overrides

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod config;
pub mod env;
pub mod schema;

pub use config::load_config;
pub use env::apply_env_overrides;
pub use schema::{
    ConfigError, DatabaseSection, EdgeSection, EmailSection, MatcherConfig, RedisSection,
    SchedulerSection,
};
