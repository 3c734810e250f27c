//! Process counters for monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Metrics collector.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Total requests processed
    pub requests_total: AtomicU64,
    /// Failed requests
    pub requests_failed: AtomicU64,
    /// Streaming sessions created
    pub sessions_created: AtomicU64,
    /// Streaming sessions closed
    pub sessions_closed: AtomicU64,
    /// Legacy SSE sessions created
    pub legacy_sessions_created: AtomicU64,
    /// Legacy SSE sessions closed
    pub legacy_sessions_closed: AtomicU64,
    /// Tool calls
    pub tool_calls: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Increment requests total.
    pub fn inc_requests(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment failed requests.
    pub fn inc_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment streaming sessions created.
    pub fn inc_sessions_created(&self) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment streaming sessions closed.
    pub fn inc_sessions_closed(&self) {
        self.sessions_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment legacy sessions created.
    pub fn inc_legacy_created(&self) {
        self.legacy_sessions_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment legacy sessions closed.
    pub fn inc_legacy_closed(&self) {
        self.legacy_sessions_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment tool calls.
    pub fn inc_tool_calls(&self) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            sessions_closed: self.sessions_closed.load(Ordering::Relaxed),
            legacy_sessions_created: self.legacy_sessions_created.load(Ordering::Relaxed),
            legacy_sessions_closed: self.legacy_sessions_closed.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_failed: u64,
    pub sessions_created: u64,
    pub sessions_closed: u64,
    pub legacy_sessions_created: u64,
    pub legacy_sessions_closed: u64,
    pub tool_calls: u64,
}

/// Timer for measuring durations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
