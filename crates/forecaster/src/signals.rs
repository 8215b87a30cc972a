//! Predictive signals feeding the ensemble.
//!
//! The sequence model consumes the full feature window; the point
//! estimators consume only the most recent vector. All three are
//! deterministic: identical inputs produce identical outputs. If a
//! trained artifact replaces one of these, any internal randomness
//! must be seed-pinned to keep forecasts reproducible.

use common::{Error, Result};

use crate::window::{FeatureVector, FeatureWindow, NO2_RATIO, O3_RATIO, PM10_RATIO, PM25_RATIO};

/// A signal that reads the whole rolling window.
pub trait SequenceModel: Send + Sync {
    fn predict(&self, window: &FeatureWindow) -> Result<f64>;
}

/// A signal that reads only the latest observation.
pub trait PointEstimator: Send + Sync {
    fn estimate(&self, latest: &FeatureVector) -> Result<f64>;
}

fn finite(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::Estimator(format!("{what} produced a non-finite value")))
    }
}

// ── Built-in signals ──────────────────────────────────────────────────

/// Recency-weighted mean of the window's AQI column plus a short-term
/// trend term. Stands in for the trained sequence model.
#[derive(Debug, Default)]
pub struct RecencyWeightedModel;

impl SequenceModel for RecencyWeightedModel {
    fn predict(&self, window: &FeatureWindow) -> Result<f64> {
        let len = window.len();
        if len == 0 {
            return Err(Error::Estimator("empty feature window".into()));
        }

        // Exponential recency weighting over the AQI column.
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        for (i, v) in window.iter().enumerate() {
            let weight = 0.85_f64.powi((len - 1 - i) as i32);
            weighted += weight * v.aqi;
            total_weight += weight;
        }
        let level = weighted / total_weight;

        // Short-term trend: last quarter of the window vs the rest.
        let split = len - (len / 4).max(1);
        let (mut head, mut tail) = (0.0, 0.0);
        for (i, v) in window.iter().enumerate() {
            if i < split {
                head += v.aqi;
            } else {
                tail += v.aqi;
            }
        }
        let head_mean = if split > 0 { head / split as f64 } else { level };
        let tail_mean = tail / (len - split) as f64;
        let trend = (tail_mean - head_mean) * 0.25;

        finite(level + trend, "sequence model")
    }
}

/// Persistence with dispersion adjustment: tomorrow looks like today,
/// nudged by how strongly wind and humidity move pollutants.
#[derive(Debug, Default)]
pub struct PersistenceEstimator;

impl PointEstimator for PersistenceEstimator {
    fn estimate(&self, latest: &FeatureVector) -> Result<f64> {
        // Wind disperses; stagnant humid air accumulates.
        let wind_relief = (latest.wind_speed * 0.004).min(0.15);
        let humidity_load = ((latest.humidity - 60.0) * 0.001).clamp(-0.05, 0.05);
        finite(
            latest.aqi * (1.0 - wind_relief + humidity_load),
            "persistence estimator",
        )
    }
}

/// Reconstructs AQI from the individual pollutant channels via the
/// fixed composition ratios, averaging the per-channel implied AQIs.
#[derive(Debug, Default)]
pub struct PollutantRatioEstimator;

impl PointEstimator for PollutantRatioEstimator {
    fn estimate(&self, latest: &FeatureVector) -> Result<f64> {
        let implied = [
            latest.pm25 / PM25_RATIO,
            latest.pm10 / PM10_RATIO,
            latest.no2 / NO2_RATIO,
            latest.o3 / O3_RATIO,
        ];
        let valid: Vec<f64> = implied.into_iter().filter(|v| v.is_finite()).collect();
        if valid.is_empty() {
            return Err(Error::Estimator(
                "no usable pollutant channels for ratio estimate".into(),
            ));
        }
        finite(
            valid.iter().sum::<f64>() / valid.len() as f64,
            "pollutant ratio estimator",
        )
    }
}
