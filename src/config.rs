//! Configuration loader — merges defaults, config.toml, and env vars.

use std::path::Path;

use common::config::MAX_FORECAST_HOURS;
use common::{Error, ServiceConfig};

fn parse_positive_u32(raw: &str, env_name: &str) -> Result<u32, Error> {
    let parsed = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn parse_positive_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer > 0")))?;
    if parsed == 0 {
        return Err(Error::Config(format!("{env_name} must be an integer > 0")));
    }
    Ok(parsed)
}

fn validate_config(config: &ServiceConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.limits.rpm_limit == 0 {
        issues.push("limits.rpm_limit must be > 0".into());
    }
    if config.limits.rph_limit == 0 {
        issues.push("limits.rph_limit must be > 0".into());
    }
    if config.limits.rph_limit < config.limits.rpm_limit {
        issues.push("limits.rph_limit must be >= limits.rpm_limit".into());
    }

    if config.cache.default_ttl_secs == 0 {
        issues.push("cache.default_ttl_secs must be > 0".into());
    }
    if config.cache.sweep_interval_secs == 0 {
        issues.push("cache.sweep_interval_secs must be > 0".into());
    }

    if config.model.sequence_length == 0 {
        issues.push("model.sequence_length must be > 0".into());
    }
    if config.model.forecast_horizon_hours == 0
        || config.model.forecast_horizon_hours > MAX_FORECAST_HOURS
    {
        issues.push(format!(
            "model.forecast_horizon_hours must be in 1..={MAX_FORECAST_HOURS}"
        ));
    }
    if config.model.history_days == 0 {
        issues.push("model.history_days must be > 0".into());
    }

    if config.cities.is_empty() {
        issues.push("cities must contain at least one city".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load service configuration from an optional config file plus
/// environment overrides (highest priority).
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, Error> {
    // 1. Load .env from the working directory or parents.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults, then the file if one exists.
    let mut config = ServiceConfig::default();
    let config_path = path.unwrap_or_else(|| Path::new("config.toml"));
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", config_path.display())))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", config_path.display())))?;
    }

    // 3. Environment overrides.
    if let Ok(raw) = std::env::var("AIRSENSE_RPM_LIMIT") {
        config.limits.rpm_limit = parse_positive_u32(&raw, "AIRSENSE_RPM_LIMIT")?;
    }
    if let Ok(raw) = std::env::var("AIRSENSE_RPH_LIMIT") {
        config.limits.rph_limit = parse_positive_u32(&raw, "AIRSENSE_RPH_LIMIT")?;
    }
    if let Ok(raw) = std::env::var("AIRSENSE_CACHE_TTL_SECS") {
        config.cache.default_ttl_secs = parse_positive_u64(&raw, "AIRSENSE_CACHE_TTL_SECS")?;
    }
    if let Ok(raw) = std::env::var("AIRSENSE_FORECAST_HOURS") {
        config.model.forecast_horizon_hours = parse_positive_u32(&raw, "AIRSENSE_FORECAST_HOURS")?;
    }
    if let Ok(raw) = std::env::var("AIRSENSE_HISTORY_DAYS") {
        config.model.history_days = parse_positive_u32(&raw, "AIRSENSE_HISTORY_DAYS")?;
    }

    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn test_validation_collects_all_issues() {
        let mut cfg = ServiceConfig::default();
        cfg.limits.rpm_limit = 0;
        cfg.cache.default_ttl_secs = 0;
        cfg.model.forecast_horizon_hours = 100;
        cfg.cities.clear();

        let err = validate_config(&cfg).unwrap_err().to_string();
        assert!(err.contains("rpm_limit"));
        assert!(err.contains("default_ttl_secs"));
        assert!(err.contains("forecast_horizon_hours"));
        assert!(err.contains("at least one city"));
    }

    #[test]
    fn test_parse_helpers_reject_zero_and_junk() {
        assert!(parse_positive_u32("0", "X").is_err());
        assert!(parse_positive_u32("abc", "X").is_err());
        assert_eq!(parse_positive_u32(" 42 ", "X").unwrap(), 42);
        assert!(parse_positive_u64("-1", "X").is_err());
    }

    #[test]
    fn test_horizon_range_enforced() {
        let mut cfg = ServiceConfig::default();
        cfg.model.forecast_horizon_hours = 72;
        assert!(validate_config(&cfg).is_ok());
        cfg.model.forecast_horizon_hours = 73;
        assert!(validate_config(&cfg).is_err());
    }
}
