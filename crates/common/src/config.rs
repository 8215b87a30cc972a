//! Service configuration types.

use serde::{Deserialize, Serialize};

/// Hard ceiling on a caller-requested forecast horizon.
pub const MAX_FORECAST_HOURS: u32 = 72;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Admission-control limits.
    #[serde(default)]
    pub limits: LimitConfig,

    /// Result-cache parameters.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Forecast model parameters.
    #[serde(default)]
    pub model: ModelConfig,

    /// Cities served.
    #[serde(default = "default_cities")]
    pub cities: Vec<CityConfig>,
}

/// Per-client request limits over sliding windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Max requests per client per trailing minute.
    #[serde(default = "default_rpm")]
    pub rpm_limit: u32,

    /// Max requests per client per trailing hour.
    #[serde(default = "default_rph")]
    pub rph_limit: u32,
}

/// Result-cache tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL applied when `set` is called without an explicit one.
    #[serde(default = "default_ttl")]
    pub default_ttl_secs: u64,

    /// Background eviction / limiter-prune cadence.
    #[serde(default = "default_sweep")]
    pub sweep_interval_secs: u64,
}

/// Forecast model parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Feature-window length in hours. Fixed at construction.
    #[serde(default = "default_sequence_length")]
    pub sequence_length: usize,

    /// Default forecast horizon when the caller does not override.
    #[serde(default = "default_horizon")]
    pub forecast_horizon_hours: u32,

    /// Days of history fetched on a cache miss.
    #[serde(default = "default_history_days")]
    pub history_days: u32,
}

/// Configuration for a single monitored city.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityConfig {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Long-run average AQI, used by the simulated providers.
    pub base_aqi: f64,
    pub population: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_rpm() -> u32 {
    60
}
fn default_rph() -> u32 {
    1000
}
fn default_ttl() -> u64 {
    3600
}
fn default_sweep() -> u64 {
    60
}
fn default_sequence_length() -> usize {
    24
}
fn default_horizon() -> u32 {
    48
}
fn default_history_days() -> u32 {
    30
}

fn city(name: &str, lat: f64, lon: f64, base_aqi: f64, population: u64) -> CityConfig {
    CityConfig {
        name: name.into(),
        lat,
        lon,
        base_aqi,
        population,
    }
}

fn default_cities() -> Vec<CityConfig> {
    vec![
        city("Delhi", 28.7041, 77.1025, 250.0, 30_000_000),
        city("Mumbai", 19.0760, 72.8777, 180.0, 20_000_000),
        city("Bangalore", 12.9716, 77.5946, 140.0, 12_000_000),
        city("Kolkata", 22.5726, 88.3639, 190.0, 14_500_000),
        city("Chennai", 13.0827, 80.2707, 130.0, 10_000_000),
        city("Hyderabad", 17.3850, 78.4867, 150.0, 10_000_000),
        city("Pune", 18.5204, 73.8567, 145.0, 7_000_000),
        city("Ahmedabad", 23.0225, 72.5714, 165.0, 8_000_000),
        city("Jaipur", 26.9124, 75.7873, 200.0, 3_500_000),
        city("Lucknow", 26.8467, 80.9462, 220.0, 3_200_000),
    ]
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            rpm_limit: default_rpm(),
            rph_limit: default_rph(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl(),
            sweep_interval_secs: default_sweep(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            sequence_length: default_sequence_length(),
            forecast_horizon_hours: default_horizon(),
            history_days: default_history_days(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            limits: LimitConfig::default(),
            cache: CacheConfig::default(),
            model: ModelConfig::default(),
            cities: default_cities(),
        }
    }
}

impl ServiceConfig {
    /// Look up a city's config by name (case-insensitive).
    pub fn city(&self, name: &str) -> Option<&CityConfig> {
        self.cities
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}
