//! Liveness monitoring.
//!
//! Every dispatched request ends in exactly one [`Completion`]. The
//! [`LivenessMonitor`] counts them and keeps an inactivity deadline that each
//! completion pushes back; a run is over once the deadline passes.

use chrono::NaiveDateTime;
use std::time::Duration;
use tokio::time::Instant;
use trace_replay_protocol::{ProtocolError, RequestTiming};

/// Terminal outcome of one dispatched request.
#[derive(Debug)]
pub struct Completion {
    pub path: String,
    pub finished_at: NaiveDateTime,
    pub outcome: Result<RequestTiming, ProtocolError>,
}

impl Completion {
    pub fn new(path: String, outcome: Result<RequestTiming, ProtocolError>) -> Self {
        Self {
            path,
            finished_at: chrono::Local::now().naive_local(),
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Counters reported when a run ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionCounts {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Tracks completions and the inactivity deadline.
#[derive(Debug)]
pub struct LivenessMonitor {
    timeout: Duration,
    deadline: Instant,
    counts: CompletionCounts,
}

impl LivenessMonitor {
    /// Start monitoring; the first deadline is `timeout` from now.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: Instant::now() + timeout,
            counts: CompletionCounts::default(),
        }
    }

    /// Count a completion and reset the deadline.
    ///
    /// Failures count as activity just like successes.
    pub fn observe(&mut self, completion: &Completion) {
        self.counts.processed += 1;
        if completion.is_success() {
            self.counts.succeeded += 1;
        } else {
            self.counts.failed += 1;
        }
        self.deadline = Instant::now() + self.timeout;
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn counts(&self) -> CompletionCounts {
        self.counts
    }
}
