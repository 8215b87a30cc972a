//! Simulated station-pattern data sources.
//!
//! Generates realistic city air-quality history and hourly weather
//! without network access: per-city AQI baselines, an improving
//! long-run trend, a seasonal sine, traffic-hour and winter loading
//! factors, and random jitter. The jitter makes these providers the
//! one non-deterministic piece of the stack; the forecaster itself is
//! deterministic for whatever inputs it is handed.

use std::f64::consts::PI;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Duration, Timelike};
use rand::Rng;
use tracing::debug;

use common::config::CityConfig;
use common::{Clock, ObservationRecord, Result, WeatherRecord};

use crate::{HistoryProvider, WeatherProvider};

const DEFAULT_BASE_AQI: f64 = 150.0;

/// Pollution load multiplier for the current traffic pattern.
fn time_factor(hour: u32) -> f64 {
    match hour {
        7..=10 | 18..=21 => 1.3,
        11..=17 => 1.1,
        _ => 0.8,
    }
}

/// Seasonal pollution multiplier (northern-India pattern: winter
/// inversion loading, monsoon washout).
fn seasonal_factor(month: u32) -> f64 {
    match month {
        11 | 12 | 1 => 1.5,
        2 | 3 => 1.2,
        6..=8 => 0.7,
        _ => 1.0,
    }
}

/// Daily AQI history generator following city baselines.
pub struct SimulatedHistoryProvider {
    cities: Vec<CityConfig>,
    clock: Arc<dyn Clock>,
}

impl SimulatedHistoryProvider {
    pub fn new(cities: Vec<CityConfig>, clock: Arc<dyn Clock>) -> Self {
        Self { cities, clock }
    }

    fn base_aqi(&self, city: &str) -> f64 {
        self.cities
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(city))
            .map(|c| c.base_aqi)
            .unwrap_or(DEFAULT_BASE_AQI)
    }
}

#[async_trait]
impl HistoryProvider for SimulatedHistoryProvider {
    async fn fetch_history(&self, city: &str, days: u32) -> Result<Vec<ObservationRecord>> {
        let now = self.clock.now();
        let base = self.base_aqi(city);
        let mut rng = rand::thread_rng();

        let mut records = Vec::with_capacity(days as usize);
        for i in (0..days).rev() {
            let timestamp = now - Duration::days(i as i64);

            let daily_variation = rng.gen_range(-30.0..30.0);
            let trend = -0.5 * i as f64; // slight long-run improvement
            let seasonal = 20.0 * (i as f64 * 0.2).sin();

            let mut aqi = base + daily_variation + trend + seasonal;
            // The newest reading reflects current traffic and season.
            if i == 0 {
                aqi *= time_factor(timestamp.hour()) * seasonal_factor(timestamp.month());
            }
            let aqi = aqi.clamp(50.0, 400.0);

            records.push(ObservationRecord {
                city: city.to_string(),
                timestamp,
                aqi: Some(aqi),
                pm25: Some(aqi * 0.6),
                pm10: Some(aqi * 0.8),
                no2: Some(aqi * 0.15),
                // Station feeds rarely carry these channels.
                so2: None,
                co: None,
                o3: None,
                temp_c: None,
                humidity: None,
                wind_speed: None,
            });
        }

        debug!(city, days, "generated simulated history");
        Ok(records)
    }
}

/// Sinusoidal diurnal weather forecast generator.
pub struct SimulatedWeatherProvider {
    clock: Arc<dyn Clock>,
}

impl SimulatedWeatherProvider {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl WeatherProvider for SimulatedWeatherProvider {
    async fn fetch_forecast(&self, city: &str, hours: u32) -> Result<Vec<WeatherRecord>> {
        let now = self.clock.now();
        let mut rng = rand::thread_rng();

        let forecast = (0..hours)
            .map(|i| {
                let h = i as f64;
                WeatherRecord {
                    hour: i,
                    timestamp: now + Duration::hours(i as i64),
                    temp_c: 20.0 + 10.0 * (h * PI / 12.0).sin() + rng.gen_range(-2.0..2.0),
                    humidity: 50.0 + 20.0 * (h * PI / 12.0).cos() + rng.gen_range(-5.0..5.0),
                    wind_speed: 10.0 + 5.0 * (h * PI / 24.0).sin() + rng.gen_range(-2.0..2.0),
                    precipitation_prob: (30.0_f64 + rng.gen_range(-20.0..20.0)).clamp(0.0, 100.0),
                }
            })
            .collect();

        debug!(city, hours, "generated simulated weather forecast");
        Ok(forecast)
    }
}
