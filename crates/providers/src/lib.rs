//! Upstream data collaborators for the forecast service.
//!
//! The service core only sees the two traits below; the simulated
//! implementations reproduce station-level patterns (city baselines,
//! traffic hours, seasonality) so the whole stack runs without
//! network access. Swapping in real CPCB / OpenWeather clients means
//! implementing the same two traits.

pub mod simulated;

use async_trait::async_trait;
use common::{ObservationRecord, Result, WeatherRecord};

pub use simulated::{SimulatedHistoryProvider, SimulatedWeatherProvider};

/// Source of recent pollutant observations, oldest first.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    async fn fetch_history(&self, city: &str, days: u32) -> Result<Vec<ObservationRecord>>;
}

/// Source of a per-hour weather forecast of exactly `hours` records.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch_forecast(&self, city: &str, hours: u32) -> Result<Vec<WeatherRecord>>;
}
