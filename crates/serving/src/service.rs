//! Forecast orchestration: cache lookup, data fetch, ensemble
//! prediction, write-back, and derived alerts.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use common::config::{ModelConfig, MAX_FORECAST_HOURS};
use common::{
    Alert, Clock, Error, ForecastResult, Result, Severity, WeatherRecord,
};
use forecaster::{EnsembleForecaster, FeatureWindow};
use providers::{HistoryProvider, WeatherProvider};

use crate::cache::{forecast_key, TtlCache};

/// The forecast-serving surface consumed by the web layer.
///
/// Cheap to clone: all state is shared behind `Arc`s, which is what
/// lets `batch_forecast` fan out per-city tasks.
#[derive(Clone)]
pub struct ForecastService {
    history: Arc<dyn HistoryProvider>,
    weather: Arc<dyn WeatherProvider>,
    forecaster: Arc<EnsembleForecaster>,
    cache: TtlCache<ForecastResult>,
    clock: Arc<dyn Clock>,
    sequence_length: usize,
    history_days: u32,
    default_horizon: u32,
}

impl ForecastService {
    pub fn new(
        history: Arc<dyn HistoryProvider>,
        weather: Arc<dyn WeatherProvider>,
        forecaster: Arc<EnsembleForecaster>,
        cache: TtlCache<ForecastResult>,
        clock: Arc<dyn Clock>,
        model: &ModelConfig,
    ) -> Self {
        Self {
            history,
            weather,
            forecaster,
            cache,
            clock,
            sequence_length: model.sequence_length,
            history_days: model.history_days,
            default_horizon: model.forecast_horizon_hours,
        }
    }

    /// Serve a forecast from cache, computing and caching on miss.
    ///
    /// Upstream failures degrade rather than fail: missing history
    /// pads the window from defaults and missing weather substitutes
    /// neutral conditions. Anything else unexpected surfaces as
    /// `ServiceUnavailable` instead of a raw internal error.
    pub async fn get_forecast(&self, city: &str, hours: u32) -> Result<ForecastResult> {
        if !(1..=MAX_FORECAST_HOURS).contains(&hours) {
            return Err(Error::InvalidRequest(format!(
                "forecast horizon must be 1..={MAX_FORECAST_HOURS} hours, got {hours}"
            )));
        }

        let key = forecast_key(city, hours);
        if let Some(hit) = self.cache.get(&key) {
            debug!(city, hours, "forecast cache hit");
            return Ok(hit);
        }

        debug!(city, hours, "forecast cache miss, computing");
        let result = self
            .compute(city, hours)
            .await
            .map_err(|e| Error::ServiceUnavailable(e.to_string()))?;
        self.cache.set(key, result.clone(), None);
        Ok(result)
    }

    async fn compute(&self, city: &str, hours: u32) -> Result<ForecastResult> {
        let history = match self.history.fetch_history(city, self.history_days).await {
            Ok(records) => records,
            Err(e) => {
                warn!(city, "history provider failed, serving degraded forecast: {e}");
                Vec::new()
            }
        };

        let weather = match self.weather.fetch_forecast(city, hours).await {
            Ok(records) => records,
            Err(e) => {
                warn!(city, "weather provider failed, using neutral conditions: {e}");
                let now = self.clock.now();
                (0..hours)
                    .map(|h| WeatherRecord::fallback(h, now + chrono::Duration::hours(h as i64)))
                    .collect()
            }
        };

        let window = FeatureWindow::from_history(&history, self.sequence_length);
        let points = self.forecaster.predict(&window, &weather, hours);

        Ok(ForecastResult {
            city: city.to_string(),
            points,
            model_accuracy: self.forecaster.accuracy(),
            confidence_interval: self.forecaster.confidence_interval(),
            generated_at: self.clock.now(),
        })
    }

    /// Forecast points above `threshold`, as alerts in forecast order.
    pub async fn get_alerts(&self, city: &str, threshold: f64) -> Result<Vec<Alert>> {
        let forecast = self.get_forecast(city, self.default_horizon).await?;
        Ok(alerts_from(&forecast, threshold))
    }

    /// One independent forecast per city. A failure for one city never
    /// cancels or corrupts the others; each entry carries its own
    /// result.
    pub async fn batch_forecast(
        &self,
        cities: &[String],
        hours: u32,
    ) -> HashMap<String, Result<ForecastResult>> {
        let mut tasks = Vec::with_capacity(cities.len());
        for city in cities {
            let service = self.clone();
            let city = city.clone();
            tasks.push(tokio::spawn(async move {
                service.get_forecast(&city, hours).await
            }));
        }

        // Tasks were spawned in `cities` order, so zipping keeps each
        // handle paired with its city even if the task panicked.
        let mut results = HashMap::with_capacity(cities.len());
        for (city, task) in cities.iter().zip(tasks) {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(%city, "batch forecast task failed: {e}");
                    Err(Error::ServiceUnavailable(format!(
                        "forecast task for {city} failed: {e}"
                    )))
                }
            };
            results.insert(city.clone(), result);
        }
        results
    }
}

/// Derive threshold-crossing alerts from a forecast, preserving order.
pub fn alerts_from(forecast: &ForecastResult, threshold: f64) -> Vec<Alert> {
    forecast
        .points
        .iter()
        .filter(|p| p.predicted_aqi > threshold)
        .map(|p| Alert {
            hour_offset: p.hour_offset,
            timestamp: p.timestamp,
            predicted_aqi: p.predicted_aqi,
            severity: if p.predicted_aqi > 300.0 {
                Severity::High
            } else {
                Severity::Moderate
            },
            recommendation: recommendation_for(p.predicted_aqi).to_string(),
        })
        .collect()
}

/// Fixed health recommendation bucketed by AQI band.
pub fn recommendation_for(aqi: f64) -> &'static str {
    if aqi > 300.0 {
        "Stay indoors. Avoid all outdoor activities. Use air purifiers."
    } else if aqi > 200.0 {
        "Limit outdoor exposure. Wear N95 masks if you must go out."
    } else if aqi > 150.0 {
        "Sensitive groups should reduce outdoor activities."
    } else {
        "Moderate air quality. Take usual precautions."
    }
}
