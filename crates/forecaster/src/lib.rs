//! Multi-model ensemble AQI forecaster.
//!
//! Turns a fixed-length rolling window of pollutant + weather
//! observations into an hour-by-hour forecast with decaying confidence
//! bounds. Three predictive signals are blended with fixed weights; a
//! signal that errors is silently replaced by a constant fallback so a
//! degraded forecast is always produced.

pub mod ensemble;
pub mod signals;
pub mod window;

pub use ensemble::EnsembleForecaster;
pub use signals::{PointEstimator, SequenceModel};
pub use window::{FeatureVector, FeatureWindow};
