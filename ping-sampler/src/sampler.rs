//! Outlier preserving downsampling of ping series.
//!
//! When a series holds more points than the chart can show, roughly 30% of
//! the budget goes to the statistically most unusual samples and the rest to
//! an even stride over the series, so loss spikes survive the reduction.

use std::collections::HashSet;

use log::debug;

use crate::record::Sample;
use crate::stats::{Metric, MetricStats};

/// Share of the target budget reserved for outliers, in tenths.
const OUTLIER_SHARE_TENTHS: usize = 3;

/// A sample with its interest score, only alive while sampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredSample {
    pub sample: Sample,
    pub interest_score: f64,
}

/// Per metric statistics used to score a series.
#[derive(Debug, Clone, Copy)]
pub struct SeriesStats {
    pub packet_loss: MetricStats,
    pub avg_latency: MetricStats,
    pub jitter: MetricStats,
}

impl SeriesStats {
    pub fn compute(samples: &[Sample]) -> Self {
        Self {
            packet_loss: MetricStats::compute(samples, Metric::PacketLoss),
            avg_latency: MetricStats::compute(samples, Metric::AvgLatency),
            jitter: MetricStats::compute(samples, Metric::Jitter),
        }
    }

    pub fn get(&self, metric: Metric) -> &MetricStats {
        match metric {
            Metric::PacketLoss => &self.packet_loss,
            Metric::AvgLatency => &self.avg_latency,
            Metric::Jitter => &self.jitter,
        }
    }

    /// Weighted sum of absolute z-scores: `3|z(loss)| + |z(latency)| + |z(jitter)|`.
    pub fn interest_score(&self, sample: &Sample) -> f64 {
        Metric::ALL
            .iter()
            .map(|&m| m.weight() * self.get(m).z_score(m.value(sample)).abs())
            .sum()
    }

    pub fn score(&self, sample: Sample) -> ScoredSample {
        ScoredSample {
            interest_score: self.interest_score(&sample),
            sample,
        }
    }
}

/// Number of slots given to outliers: `ceil(target_count * 0.3)`.
pub fn outlier_budget(target_count: usize) -> usize {
    (target_count * OUTLIER_SHARE_TENTHS).div_ceil(10)
}

/// Reduce `series` to at most `target_count` samples.
///
/// The result is sorted by timestamp, free of duplicate timestamps and made
/// only of input samples. Series that already fit are returned sorted with
/// nothing dropped. The first and last sample are not guaranteed to be kept.
pub fn sample(series: &[Sample], target_count: usize) -> Vec<Sample> {
    if target_count == 0 {
        return Vec::new();
    }

    let mut sorted = series.to_vec();
    sorted.sort_by_key(|s| s.timestamp);
    if sorted.len() <= target_count {
        return sorted;
    }

    let stats = SeriesStats::compute(&sorted);
    let outlier_budget = outlier_budget(target_count);
    let regular_budget = target_count - outlier_budget;

    let mut scored: Vec<ScoredSample> = sorted.iter().map(|&s| stats.score(s)).collect();
    // stable, so equal scores keep series order
    scored.sort_by(|a, b| b.interest_score.total_cmp(&a.interest_score));
    let outliers = scored.iter().take(outlier_budget).map(|s| s.sample);

    let regular: Vec<Sample> = if regular_budget == 0 {
        Vec::new()
    } else {
        let stride = (sorted.len() / regular_budget).max(1);
        sorted
            .iter()
            .step_by(stride)
            .take(regular_budget)
            .copied()
            .collect()
    };

    let mut seen = HashSet::with_capacity(target_count);
    let mut result: Vec<Sample> = outliers
        .chain(regular)
        .filter(|s| seen.insert(s.timestamp))
        .collect();
    result.sort_by_key(|s| s.timestamp);

    debug!(
        "sampled {} points down to {} ({} outlier slots, {} regular slots)",
        series.len(),
        result.len(),
        outlier_budget,
        regular_budget
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(minute: i64, loss: f64) -> Sample {
        let ts = Utc.timestamp_opt(1_700_000_000 + minute * 60, 0).unwrap();
        Sample::new(ts, loss, 20.0, 2.0)
    }

    #[test]
    fn budgets_split_with_ceiling() {
        assert_eq!(outlier_budget(1), 1);
        assert_eq!(outlier_budget(3), 1);
        assert_eq!(outlier_budget(4), 2);
        assert_eq!(outlier_budget(10), 3);
        assert_eq!(outlier_budget(70), 21);
        assert_eq!(outlier_budget(100), 30);
    }

    #[test]
    fn small_series_is_only_sorted() {
        let series = vec![at(3, 0.0), at(1, 0.0), at(2, 0.0)];
        let out = sample(&series, 3);
        assert_eq!(out, vec![at(1, 0.0), at(2, 0.0), at(3, 0.0)]);
    }

    #[test]
    fn zero_target_is_empty() {
        assert!(sample(&[at(0, 0.0), at(1, 0.0)], 0).is_empty());
        assert!(sample(&[], 0).is_empty());
        assert!(sample(&[], 5).is_empty());
    }

    #[test]
    fn exact_selection_for_small_budget() {
        // target 4: 2 outlier slots, 2 regular slots with stride 5 (indices 0 and 5)
        let mut series: Vec<Sample> = (0..10).map(|m| at(m, 0.0)).collect();
        series[7] = at(7, 50.0);
        series[3] = at(3, 20.0);

        let out = sample(&series, 4);
        let minutes: Vec<i64> = out
            .iter()
            .map(|s| (s.timestamp.timestamp() - 1_700_000_000) / 60)
            .collect();
        assert_eq!(minutes, vec![0, 3, 5, 7]);
    }

    #[test]
    fn outlier_wins_timestamp_collision() {
        // the spike sits on index 0 which the stride also visits
        let mut series: Vec<Sample> = (0..10).map(|m| at(m, 0.0)).collect();
        series[0] = at(0, 80.0);

        let out = sample(&series, 4);
        assert!(out.len() <= 4);
        assert_eq!(out.iter().filter(|s| s.timestamp == series[0].timestamp).count(), 1);
        assert_eq!(out[0].packet_loss, 80.0);
    }

    #[test]
    fn single_slot_takes_the_top_outlier() {
        let mut series: Vec<Sample> = (0..20).map(|m| at(m, 1.0)).collect();
        series[13] = at(13, 99.0);

        let out = sample(&series, 1);
        assert_eq!(out, vec![at(13, 99.0)]);
    }

    #[test]
    fn constant_series_does_not_produce_nan() {
        let series: Vec<Sample> = (0..50).map(|m| at(m, 0.5)).collect();
        let stats = SeriesStats::compute(&series);
        assert!(series.iter().all(|s| stats.interest_score(s) == 0.0));

        let out = sample(&series, 10);
        assert!(!out.is_empty() && out.len() <= 10);
    }

    #[test]
    fn ties_keep_series_order() {
        // all scores are equal, so the 3 outlier slots go to minutes 0, 1 and 2;
        // the stride of 2 over 7 regular slots adds the even minutes up to 12
        let series: Vec<Sample> = (0..20).rev().map(|m| at(m, 0.5)).collect();

        let out = sample(&series, 10);
        let minutes: Vec<i64> = out
            .iter()
            .map(|s| (s.timestamp.timestamp() - 1_700_000_000) / 60)
            .collect();
        assert_eq!(minutes, vec![0, 1, 2, 4, 6, 8, 10, 12]);
    }

    #[test]
    fn loss_is_weighted_triple() {
        let series = vec![
            Sample::new(Utc.timestamp_opt(0, 0).unwrap(), 0.0, 0.0, 0.0),
            Sample::new(Utc.timestamp_opt(60, 0).unwrap(), 2.0, 2.0, 2.0),
        ];
        let stats = SeriesStats::compute(&series);
        // each metric has mean 1 and std dev 1, so every |z| is 1
        assert!((stats.interest_score(&series[0]) - 5.0).abs() < 1e-9);
    }
}
