//! Feature vectors and the fixed-length rolling feature window.

use std::collections::VecDeque;

use common::{ObservationRecord, WeatherRecord};

/// Ratio of estimated PM2.5 to AQI when synthesizing a vector from a
/// predicted AQI. The remaining ratios follow the same convention.
pub const PM25_RATIO: f64 = 0.6;
pub const PM10_RATIO: f64 = 0.8;
pub const NO2_RATIO: f64 = 0.15;
pub const SO2_RATIO: f64 = 0.08;
pub const CO_RATIO: f64 = 0.01;
pub const O3_RATIO: f64 = 0.12;

/// One hour of model input: ten pollutant/weather readings.
/// Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub aqi: f64,
    pub pm25: f64,
    pub pm10: f64,
    pub no2: f64,
    pub so2: f64,
    pub co: f64,
    pub o3: f64,
    pub temp_c: f64,
    pub humidity: f64,
    pub wind_speed: f64,
}

impl FeatureVector {
    /// Constant defaults used when an observation channel is missing
    /// or no history exists at all.
    pub fn defaults() -> Self {
        Self {
            aqi: 150.0,
            pm25: 90.0,
            pm10: 140.0,
            no2: 40.0,
            so2: 10.0,
            co: 1.5,
            o3: 30.0,
            temp_c: 25.0,
            humidity: 60.0,
            wind_speed: 10.0,
        }
    }

    /// Build from an observation, substituting defaults for any
    /// missing channel.
    pub fn from_observation(rec: &ObservationRecord) -> Self {
        let d = Self::defaults();
        Self {
            aqi: rec.aqi.unwrap_or(d.aqi),
            pm25: rec.pm25.unwrap_or(d.pm25),
            pm10: rec.pm10.unwrap_or(d.pm10),
            no2: rec.no2.unwrap_or(d.no2),
            so2: rec.so2.unwrap_or(d.so2),
            co: rec.co.unwrap_or(d.co),
            o3: rec.o3.unwrap_or(d.o3),
            temp_c: rec.temp_c.unwrap_or(d.temp_c),
            humidity: rec.humidity.unwrap_or(d.humidity),
            wind_speed: rec.wind_speed.unwrap_or(d.wind_speed),
        }
    }

    /// Synthesize the next-hour vector from a predicted AQI and that
    /// hour's weather, using the fixed pollutant ratios.
    pub fn synthesized(predicted_aqi: f64, weather: &WeatherRecord) -> Self {
        Self {
            aqi: predicted_aqi,
            pm25: predicted_aqi * PM25_RATIO,
            pm10: predicted_aqi * PM10_RATIO,
            no2: predicted_aqi * NO2_RATIO,
            so2: predicted_aqi * SO2_RATIO,
            co: predicted_aqi * CO_RATIO,
            o3: predicted_aqi * O3_RATIO,
            temp_c: weather.temp_c,
            humidity: weather.humidity,
            wind_speed: weather.wind_speed,
        }
    }
}

/// Fixed-length rolling window of the most recent observed hours,
/// oldest first. Length never changes after construction: advancing
/// drops the oldest vector and appends a new one.
#[derive(Debug, Clone)]
pub struct FeatureWindow {
    slots: VecDeque<FeatureVector>,
}

impl FeatureWindow {
    /// Build a window of exactly `length` vectors from history
    /// (oldest first). Only the trailing `length` records are used;
    /// if fewer exist, the earliest real vector is replicated to pad
    /// the front. An empty history pads entirely with defaults.
    pub fn from_history(history: &[ObservationRecord], length: usize) -> Self {
        assert!(length > 0, "window length must be positive");

        let tail_start = history.len().saturating_sub(length);
        let mut slots: VecDeque<FeatureVector> = history[tail_start..]
            .iter()
            .map(FeatureVector::from_observation)
            .collect();

        let pad = slots.front().copied().unwrap_or_else(FeatureVector::defaults);
        while slots.len() < length {
            slots.push_front(pad);
        }

        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Most recent vector.
    pub fn latest(&self) -> &FeatureVector {
        self.slots.back().expect("window is never empty")
    }

    /// Oldest-first iteration over the window.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureVector> {
        self.slots.iter()
    }

    /// Drop the oldest vector and append `next`, preserving length.
    pub fn advance(&mut self, next: FeatureVector) {
        self.slots.pop_front();
        self.slots.push_back(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn obs(aqi: f64) -> ObservationRecord {
        ObservationRecord {
            city: "Delhi".into(),
            timestamp: Utc::now(),
            aqi: Some(aqi),
            pm25: Some(aqi * 0.6),
            pm10: Some(aqi * 0.8),
            no2: Some(aqi * 0.15),
            so2: None,
            co: None,
            o3: None,
            temp_c: Some(28.0),
            humidity: Some(55.0),
            wind_speed: Some(12.0),
        }
    }

    #[test]
    fn test_single_record_pads_front() {
        let window = FeatureWindow::from_history(&[obs(210.0)], 24);
        assert_eq!(window.len(), 24);
        let first = *window.iter().next().unwrap();
        for v in window.iter().take(23) {
            assert_eq!(*v, first);
        }
        assert_eq!(window.latest().aqi, 210.0);
    }

    #[test]
    fn test_empty_history_pads_with_defaults() {
        let window = FeatureWindow::from_history(&[], 24);
        assert_eq!(window.len(), 24);
        assert_eq!(window.latest().aqi, 150.0);
    }

    #[test]
    fn test_long_history_keeps_trailing_records() {
        let history: Vec<_> = (0..30).map(|i| obs(100.0 + i as f64)).collect();
        let window = FeatureWindow::from_history(&history, 24);
        assert_eq!(window.len(), 24);
        // Last 24 of 30: aqi 106..=129.
        assert_eq!(window.iter().next().unwrap().aqi, 106.0);
        assert_eq!(window.latest().aqi, 129.0);
    }

    #[test]
    fn test_missing_channels_use_defaults() {
        let window = FeatureWindow::from_history(&[obs(200.0)], 1);
        let v = window.latest();
        assert_eq!(v.so2, 10.0);
        assert_eq!(v.co, 1.5);
        assert_eq!(v.o3, 30.0);
    }

    #[test]
    fn test_advance_preserves_length() {
        let mut window = FeatureWindow::from_history(&[obs(100.0), obs(120.0)], 24);
        let weather = WeatherRecord::fallback(0, Utc::now());
        window.advance(FeatureVector::synthesized(180.0, &weather));
        assert_eq!(window.len(), 24);
        assert_eq!(window.latest().aqi, 180.0);
        assert_eq!(window.latest().pm25, 180.0 * 0.6);
    }

    #[test]
    fn test_synthesized_ratios() {
        let weather = WeatherRecord {
            hour: 3,
            timestamp: Utc::now(),
            temp_c: 31.0,
            humidity: 45.0,
            wind_speed: 7.0,
            precipitation_prob: 10.0,
        };
        let v = FeatureVector::synthesized(100.0, &weather);
        assert_eq!(v.pm25, 60.0);
        assert_eq!(v.pm10, 80.0);
        assert_eq!(v.no2, 15.0);
        assert_eq!(v.so2, 8.0);
        assert_eq!(v.co, 1.0);
        assert_eq!(v.o3, 12.0);
        assert_eq!(v.temp_c, 31.0);
        assert_eq!(v.wind_speed, 7.0);
    }
}
