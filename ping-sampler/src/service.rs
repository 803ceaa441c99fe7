use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use log::{debug, info};

use crate::chart::{ChartSeries, chart_series};
use crate::range::{self, RangeSelection, TimeRangeOption};
use crate::record::{self, Sample};
use crate::sampler;
use crate::stats::Metric;
use crate::summary::{self, NetworkStats};

pub const DEFAULT_WINDOW_HOURS: i64 = 24;
pub const DEFAULT_LIMIT: usize = 1000;
pub const DEFAULT_DISPLAY_BUDGET: usize = 1000;

/// Dashboard state: the loaded samples plus the range the charts show.
///
/// The host creates one per view and drops it on teardown, nothing here is
/// global.
#[derive(Clone)]
pub struct Service {
    samples: Vec<Sample>,
    selection: RangeSelection,
    limit: usize,
    display_budget: usize,
}

impl Service {
    pub fn new(limit: usize, display_budget: usize) -> Self {
        Self {
            samples: Vec::new(),
            selection: RangeSelection::default(),
            limit,
            display_budget,
        }
    }

    /// Replace the stored samples.
    pub fn set_samples(&mut self, mut samples: Vec<Sample>) {
        samples.sort_by_key(|s| s.timestamp);
        info!("loaded {} ping samples", samples.len());
        self.samples = samples;
    }

    /// Decode a JSON array of ping records and store them.
    pub fn ingest_json(&mut self, json: &str) -> Result<usize> {
        let samples = record::samples_from_json(json)?;
        let count = samples.len();
        self.set_samples(samples);
        Ok(count)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// The newest `limit` samples no older than `hours` before `now`, oldest first.
    pub fn window(&self, now: DateTime<Utc>, hours: i64, limit: usize) -> Vec<Sample> {
        let since = now - Duration::hours(hours);
        let recent: Vec<Sample> = self
            .samples
            .iter()
            .filter(|s| s.timestamp >= since)
            .copied()
            .collect();
        let skip = recent.len().saturating_sub(limit);
        recent[skip..].to_vec()
    }

    /// [`Service::window`] reduced to the display budget by the adaptive sampler.
    pub fn display_series(&self, now: DateTime<Utc>, hours: i64) -> Vec<Sample> {
        let window = self.window(now, hours, self.limit);
        if window.len() <= self.display_budget {
            return window;
        }
        debug!(
            "window of {}h holds {} samples, over the budget of {}",
            hours,
            window.len(),
            self.display_budget
        );
        sampler::sample(&window, self.display_budget)
    }

    pub fn data_span_hours(&self) -> Option<f64> {
        range::data_span_hours(&self.samples)
    }

    pub fn selected_hours(&self) -> u32 {
        self.selection.selected_hours()
    }

    pub fn select_range(&mut self, hours: u32) -> bool {
        let span = self.data_span_hours();
        self.selection.select(hours, span)
    }

    pub fn range_options(&self) -> Vec<TimeRangeOption> {
        self.selection.options(self.data_span_hours())
    }

    /// Chart series for `metric` over the selected range ending at `now`.
    pub fn chart<Tz: TimeZone>(&self, now: DateTime<Utc>, metric: Metric, tz: &Tz) -> ChartSeries
    where
        Tz::Offset: std::fmt::Display,
    {
        let hours = self.selected_hours();
        let series = self.display_series(now, i64::from(hours));
        chart_series(&series, metric, hours, tz)
    }

    pub fn stats(&self, now: DateTime<Utc>) -> Option<NetworkStats> {
        summary::network_stats(&self.samples, now, DEFAULT_WINDOW_HOURS)
    }
}

impl Default for Service {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, DEFAULT_DISPLAY_BUDGET)
    }
}
