// Configuration loading and validation
//
// Loading hierarchy: env > file > defaults

use std::path::Path;

use crate::env::apply_env_overrides;
use crate::schema::{ConfigError, MatcherConfig};

/// Load the effective configuration: defaults, then the optional TOML file
/// named by `GMATCH_CONFIG`, then `GMATCH_*` environment overrides.
pub fn load_config() -> Result<MatcherConfig, ConfigError> {
    let mut config = match std::env::var("GMATCH_CONFIG") {
        Ok(path) if !path.is_empty() => load_from_file(Path::new(&path))?,
        _ => MatcherConfig::default(),
    };

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Load configuration from a TOML file. Absent keys fall back to defaults.
pub fn load_from_file(path: &Path) -> Result<MatcherConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Validate the configuration. Rejections here are fatal startup errors.
pub fn validate_config(config: &MatcherConfig) -> Result<(), ConfigError> {
    if config.edge.poll_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "edge.poll_interval_secs must be positive".to_string(),
        ));
    }

    if config.scheduler.interval_secs == 0 {
        return Err(ConfigError::Validation(
            "scheduler.interval_secs must be positive".to_string(),
        ));
    }

    if !(0.0..=100.0).contains(&config.scheduler.match_threshold) {
        return Err(ConfigError::Validation(format!(
            "scheduler.match_threshold {} outside 0..=100",
            config.scheduler.match_threshold
        )));
    }

    if config.scheduler.mget_batch == 0 {
        return Err(ConfigError::Validation(
            "scheduler.mget_batch must be positive".to_string(),
        ));
    }

    if config.io_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "io_timeout_secs must be positive".to_string(),
        ));
    }

    // The lock must outlive a cycle's worst-case I/O by a comfortable margin.
    if config.scheduler.lock_expire_secs < 2 * config.io_timeout_secs {
        return Err(ConfigError::Validation(format!(
            "scheduler.lock_expire_secs {} must be at least twice io_timeout_secs {}",
            config.scheduler.lock_expire_secs, config.io_timeout_secs
        )));
    }

    if config.redis.url.is_empty() {
        return Err(ConfigError::Validation("redis.url cannot be empty".to_string()));
    }

    if config.database.url.is_empty() {
        return Err(ConfigError::Validation(
            "database.url cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MatcherConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.edge.poll_interval_secs, 10);
        assert_eq!(config.scheduler.interval_secs, 300);
        assert_eq!(config.scheduler.match_threshold, 80.0);
        assert!(!config.scheduler.priority_bypass_enabled);
        assert_eq!(config.scheduler.priority_bypass, 10);
        assert_eq!(config.scheduler.expire_after_secs, 86_400);
        assert_eq!(config.scheduler.lock_expire_secs, 120);
        assert_eq!(config.scheduler.mget_batch, 500);
        assert!(config.email.enabled);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = MatcherConfig::default();
        config.scheduler.interval_secs = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let mut config = MatcherConfig::default();
        config.scheduler.match_threshold = 120.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_short_lock_expire_rejected() {
        let mut config = MatcherConfig::default();
        config.scheduler.lock_expire_secs = 5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let parsed: MatcherConfig =
            toml::from_str("[scheduler]\nmatch_threshold = 70.0\n").unwrap();
        assert_eq!(parsed.scheduler.match_threshold, 70.0);
        assert_eq!(parsed.scheduler.interval_secs, 300);
        assert_eq!(parsed.edge.poll_interval_secs, 10);
    }
}
