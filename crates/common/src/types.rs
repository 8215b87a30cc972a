//! Domain types shared across the forecast-serving crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Observation Inputs ────────────────────────────────────────────────

/// One hour of observed pollutant + weather readings for a city.
///
/// Upstream records are frequently partial (a station drops a channel,
/// a weather join misses), so every reading is optional; consumers
/// substitute fixed defaults for missing values rather than failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub city: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub aqi: Option<f64>,
    #[serde(default)]
    pub pm25: Option<f64>,
    #[serde(default)]
    pub pm10: Option<f64>,
    #[serde(default)]
    pub no2: Option<f64>,
    #[serde(default)]
    pub so2: Option<f64>,
    #[serde(default)]
    pub co: Option<f64>,
    #[serde(default)]
    pub o3: Option<f64>,
    #[serde(default)]
    pub temp_c: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
}

/// One forecast hour of weather conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub hour: u32,
    pub timestamp: DateTime<Utc>,
    pub temp_c: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    #[serde(default)]
    pub precipitation_prob: f64,
}

impl WeatherRecord {
    /// Neutral conditions used when the weather provider is down.
    pub fn fallback(hour: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            hour,
            timestamp,
            temp_c: 25.0,
            humidity: 60.0,
            wind_speed: 10.0,
            precipitation_prob: 0.0,
        }
    }
}

// ── Forecast Outputs ──────────────────────────────────────────────────

/// AQI severity band. Band boundaries are inclusive on the lower side:
/// exactly 50 is still `Good`, exactly 300 is still `VeryPoor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Good,
    Moderate,
    Poor,
    #[serde(rename = "Very Poor")]
    VeryPoor,
    Severe,
}

impl RiskLevel {
    pub fn from_aqi(aqi: f64) -> Self {
        if aqi <= 50.0 {
            RiskLevel::Good
        } else if aqi <= 100.0 {
            RiskLevel::Moderate
        } else if aqi <= 200.0 {
            RiskLevel::Poor
        } else if aqi <= 300.0 {
            RiskLevel::VeryPoor
        } else {
            RiskLevel::Severe
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RiskLevel::Good => "Good",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::Poor => "Poor",
            RiskLevel::VeryPoor => "Very Poor",
            RiskLevel::Severe => "Severe",
        };
        write!(f, "{label}")
    }
}

/// A single predicted hour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Hours from forecast generation (0-based, contiguous).
    pub hour_offset: u32,
    pub timestamp: DateTime<Utc>,
    /// Point estimate, floored at 0.
    pub predicted_aqi: f64,
    /// Confidence percent, always within [70, 95].
    pub confidence_percent: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub risk_level: RiskLevel,
}

/// Reported model confidence interval metadata.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

/// A complete forecast for one city. Immutable once built; the cache
/// hands out clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResult {
    pub city: String,
    pub points: Vec<ForecastPoint>,
    pub model_accuracy: f64,
    pub confidence_interval: ConfidenceInterval,
    pub generated_at: DateTime<Utc>,
}

// ── Alerts ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Moderate,
    High,
}

/// A threshold-crossing alert derived from a forecast point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub hour_offset: u32,
    pub timestamp: DateTime<Utc>,
    pub predicted_aqi: f64,
    pub severity: Severity,
    pub recommendation: String,
}
