//! Unified error type for the forecast-serving core.

use std::time::Duration;

use thiserror::Error;

/// Which sliding window rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitWindow {
    Minute,
    Hour,
}

impl std::fmt::Display for LimitWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitWindow::Minute => write!(f, "minute"),
            LimitWindow::Hour => write!(f, "hour"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("rate limit exceeded: {limit} requests per {window} — retry after {retry_after:?}")]
    RateLimited {
        window: LimitWindow,
        limit: u32,
        retry_after: Duration,
    },

    #[error("upstream data source failed: {0}")]
    Upstream(String),

    #[error("estimator failed: {0}")]
    Estimator(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("forecast service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
