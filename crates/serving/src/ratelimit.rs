//! Dual-window per-client admission control.
//!
//! Every client gets a trailing one-minute and one-hour request
//! window. The decision path always re-filters timestamps to the
//! exact window boundary, so the background prune (which only bounds
//! memory) can lag without ever changing an allow/deny outcome.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::sweep::{spawn_sweep, SweepHandle};
use common::error::LimitWindow;
use common::{Clock, Error};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied {
        window: LimitWindow,
        limit: u32,
        retry_after: Duration,
    },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }

    /// Convert into the service error taxonomy.
    pub fn into_result(self) -> Result<(), Error> {
        match self {
            Admission::Allowed => Ok(()),
            Admission::Denied {
                window,
                limit,
                retry_after,
            } => Err(Error::RateLimited {
                window,
                limit,
                retry_after,
            }),
        }
    }
}

#[derive(Debug, Default)]
struct ClientWindows {
    minute: VecDeque<DateTime<Utc>>,
    hour: VecDeque<DateTime<Utc>>,
}

/// Sliding-window request limiter keyed by opaque client id.
///
/// How the id is derived (forwarded-for header vs peer address) is the
/// caller's concern.
#[derive(Clone)]
pub struct RateLimiter {
    clients: Arc<DashMap<String, ClientWindows>>,
    rpm_limit: u32,
    rph_limit: u32,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(rpm_limit: u32, rph_limit: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            clients: Arc::new(DashMap::new()),
            rpm_limit,
            rph_limit,
            clock,
        }
    }

    /// Admit or deny one request. On admit, the current timestamp is
    /// recorded in both windows; a denied attempt records nothing.
    /// The minute window is checked first, so when both limits would
    /// trip, the minute limit is the reported reason.
    pub fn check_and_record(&self, client_id: &str) -> Admission {
        let now = self.clock.now();
        // DashMap entry guard keeps check-then-record atomic per client.
        let mut client = self.clients.entry(client_id.to_string()).or_default();

        if let Some(denied) = denied_by(
            &client.minute,
            now,
            chrono::Duration::minutes(1),
            self.rpm_limit,
            LimitWindow::Minute,
        ) {
            debug!(client_id, "denied by minute window");
            return denied;
        }

        if let Some(denied) = denied_by(
            &client.hour,
            now,
            chrono::Duration::hours(1),
            self.rph_limit,
            LimitWindow::Hour,
        ) {
            debug!(client_id, "denied by hour window");
            return denied;
        }

        client.minute.push_back(now);
        client.hour.push_back(now);
        Admission::Allowed
    }

    /// Trim stored timestamps to the last 2 minutes / 2 hours and drop
    /// clients with nothing left. Memory bound only; decisions never
    /// depend on this having run.
    pub fn prune(&self) {
        let now = self.clock.now();
        let minute_cutoff = now - chrono::Duration::minutes(2);
        let hour_cutoff = now - chrono::Duration::hours(2);

        let before = self.clients.len();
        self.clients.retain(|_, windows| {
            windows.minute.retain(|ts| *ts > minute_cutoff);
            windows.hour.retain(|ts| *ts > hour_cutoff);
            !windows.minute.is_empty() || !windows.hour.is_empty()
        });
        let dropped = before - self.clients.len();
        if dropped > 0 {
            debug!(dropped, remaining = self.clients.len(), "limiter prune");
        }
    }

    /// Start the periodic prune task.
    pub fn spawn_sweeper(&self, every: Duration) -> SweepHandle {
        let limiter = self.clone();
        spawn_sweep(every, move || limiter.prune())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

/// Deny if the count of timestamps inside the trailing window has
/// reached `limit`. The retry hint is how long until the oldest
/// in-window timestamp ages out.
fn denied_by(
    window: &VecDeque<DateTime<Utc>>,
    now: DateTime<Utc>,
    length: chrono::Duration,
    limit: u32,
    which: LimitWindow,
) -> Option<Admission> {
    let cutoff = now - length;
    let in_window = window.iter().filter(|ts| **ts > cutoff).count();
    if (in_window as u32) < limit {
        return None;
    }

    let retry_after = window
        .iter()
        .find(|ts| **ts > cutoff)
        .map(|oldest| (*oldest + length - now).to_std().unwrap_or_default())
        .unwrap_or_else(|| length.to_std().unwrap_or_default());

    Some(Admission::Denied {
        window: which,
        limit,
        retry_after,
    })
}
