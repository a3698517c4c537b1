//! In-process metrics for the current run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Round-trip times of backend calls.
#[derive(Debug, Default)]
pub struct Latency {
    count: AtomicU64,
    total_ms: AtomicU64,
    max_ms: AtomicU64,
}

impl Latency {
    pub fn record(&self, elapsed: Duration) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ms.fetch_add(ms, Ordering::Relaxed);
        self.max_ms.fetch_max(ms, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn mean_ms(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.total_ms.load(Ordering::Relaxed) as f64 / n as f64,
        }
    }

    pub fn max_ms(&self) -> u64 {
        self.max_ms.load(Ordering::Relaxed)
    }
}

/// Send workflow and tracker counters.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Replies received, anonymous or not
    pub messages_sent: Counter,
    pub anonymous_messages_sent: Counter,
    /// Refused locally by the anonymous gate
    pub messages_blocked: Counter,
    /// Replies carrying the backend's limit flag
    pub server_limit_signals: Counter,
    pub send_failures: Counter,
    pub window_resets: Counter,
    pub auth_resets: Counter,
    pub send_latency: Latency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub messages_sent: u64,
    pub anonymous_messages_sent: u64,
    pub messages_blocked: u64,
    pub server_limit_signals: u64,
    pub send_failures: u64,
    pub window_resets: u64,
    pub auth_resets: u64,
    pub send_latency_mean_ms: f64,
    pub send_latency_max_ms: u64,
}

impl Metrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            messages_sent: self.messages_sent.get(),
            anonymous_messages_sent: self.anonymous_messages_sent.get(),
            messages_blocked: self.messages_blocked.get(),
            server_limit_signals: self.server_limit_signals.get(),
            send_failures: self.send_failures.get(),
            window_resets: self.window_resets.get(),
            auth_resets: self.auth_resets.get(),
            send_latency_mean_ms: self.send_latency.mean_ms(),
            send_latency_max_ms: self.send_latency.max_ms(),
        }
    }
}

static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::default);

/// Process-wide metrics.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
