//! Forecast-serving hot path: TTL result cache, per-client rate
//! limiter, and the orchestrating forecast service.
//!
//! The cache and limiter are the only shared-mutable state in the
//! request path; both are safe under concurrent use and both carry an
//! injectable clock so tests drive virtual time instead of sleeping.

pub mod cache;
pub mod ratelimit;
pub mod service;
pub mod sweep;

pub use cache::{forecast_key, TtlCache};
pub use ratelimit::{Admission, RateLimiter};
pub use service::ForecastService;
pub use sweep::SweepHandle;
