use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tdigest::TDigest;

use crate::record::Sample;
use crate::stats::{Metric, MetricStats};

/// Latency distribution of a set of samples, kept as a t-digest.
pub struct LatencySummary {
    digest: TDigest,
    count: u64,
}

impl LatencySummary {
    /// Empty summary, compressed to 100 centroids.
    pub fn new() -> Self {
        LatencySummary {
            digest: TDigest::new_with_size(100),
            count: 0,
        }
    }

    pub fn from_samples(samples: &[Sample]) -> Self {
        let mut summary = Self::new();
        summary.add_latencies(samples.iter().map(|s| s.avg_latency).collect());
        summary
    }

    /// Add a batch of latency measurements in milliseconds
    pub fn add_latencies(&mut self, latencies_ms: Vec<f64>) {
        if latencies_ms.is_empty() {
            return;
        }
        self.count += latencies_ms.len() as u64;
        self.digest = self.digest.merge_unsorted(latencies_ms);
    }

    /// Returns the p99 quantile of the latencies
    pub fn p99(&self) -> f64 {
        self.quantile(0.99)
    }

    pub fn p95(&self) -> f64 {
        self.quantile(0.95)
    }

    pub fn p90(&self) -> f64 {
        self.quantile(0.90)
    }

    pub fn p75(&self) -> f64 {
        self.quantile(0.75)
    }

    /// Returns the median latency
    pub fn p50(&self) -> f64 {
        self.quantile(0.50)
    }

    /// Estimated latency at quantile `q` in `[0, 1]`, 0 while empty.
    pub fn quantile(&self, q: f64) -> f64 {
        self.digest.estimate_quantile(q)
    }

    /// Number of latencies merged so far
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn quantiles(&self) -> LatencyQuantiles {
        LatencyQuantiles {
            sample_count: self.count,
            p50: self.p50(),
            p75: self.p75(),
            p90: self.p90(),
            p95: self.p95(),
            p99: self.p99(),
        }
    }
}

impl Default for LatencySummary {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyQuantiles {
    pub sample_count: u64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Averages over a trailing window, as shown on the dashboard header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowStats {
    pub avg_packet_loss: f64,
    pub avg_latency: f64,
    pub avg_jitter: f64,
    pub min_latency: f64,
    pub max_latency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkStats {
    pub latest: Sample,
    pub window_hours: i64,
    pub window: WindowStats,
    pub latency: LatencyQuantiles,
}

/// Statistics over the samples within `window_hours` of `now`.
///
/// Returns `None` when there is no sample at all. A window without samples
/// reports zeros, like the backend did for empty aggregates.
pub fn network_stats(samples: &[Sample], now: DateTime<Utc>, window_hours: i64) -> Option<NetworkStats> {
    let latest = *samples.iter().max_by_key(|s| s.timestamp)?;

    let since = now - Duration::hours(window_hours);
    let recent: Vec<Sample> = samples.iter().filter(|s| s.timestamp >= since).copied().collect();

    let window = if recent.is_empty() {
        WindowStats {
            avg_packet_loss: 0.0,
            avg_latency: 0.0,
            avg_jitter: 0.0,
            min_latency: 0.0,
            max_latency: 0.0,
        }
    } else {
        let latency = MetricStats::compute(&recent, Metric::AvgLatency);
        WindowStats {
            avg_packet_loss: MetricStats::compute(&recent, Metric::PacketLoss).mean,
            avg_latency: latency.mean,
            avg_jitter: MetricStats::compute(&recent, Metric::Jitter).mean,
            min_latency: recent
                .iter()
                .map(Sample::min_latency_or_avg)
                .fold(f64::INFINITY, f64::min),
            max_latency: recent
                .iter()
                .map(Sample::max_latency_or_avg)
                .fold(f64::NEG_INFINITY, f64::max),
        }
    };

    Some(NetworkStats {
        latest,
        window_hours,
        window,
        latency: LatencySummary::from_samples(&recent).quantiles(),
    })
}
