//! Chart series derived from samples.
//!
//! Everything here is a pure function of the samples and the selected range,
//! callers recompute when either changes.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::record::Sample;
use crate::stats::Metric;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Extract one metric as `(timestamp, value)` points in time order.
pub fn metric_series(samples: &[Sample], metric: Metric) -> Vec<MetricPoint> {
    let mut points: Vec<MetricPoint> = samples
        .iter()
        .map(|s| MetricPoint {
            timestamp: s.timestamp,
            value: metric.value(s),
        })
        .collect();
    points.sort_by_key(|p| p.timestamp);
    points
}

/// Axis label for `ts`: `HH:MM` up to 12 hours, `MM/DD HH:00` beyond.
pub fn format_label<Tz: TimeZone>(ts: &DateTime<Utc>, selected_hours: u32, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let local = ts.with_timezone(tz);
    if selected_hours <= 12 {
        local.format("%H:%M").to_string()
    } else {
        local.format("%m/%d %H:00").to_string()
    }
}

pub fn chart_values(points: &[MetricPoint]) -> Vec<f64> {
    points.iter().map(|p| p.value).collect()
}

pub fn chart_labels<Tz: TimeZone>(points: &[MetricPoint], selected_hours: u32, tz: &Tz) -> Vec<String>
where
    Tz::Offset: std::fmt::Display,
{
    points
        .iter()
        .map(|p| format_label(&p.timestamp, selected_hours, tz))
        .collect()
}

pub fn chart_series<Tz: TimeZone>(
    samples: &[Sample],
    metric: Metric,
    selected_hours: u32,
    tz: &Tz,
) -> ChartSeries
where
    Tz::Offset: std::fmt::Display,
{
    let points = metric_series(samples, metric);
    ChartSeries {
        labels: chart_labels(&points, selected_hours, tz),
        values: chart_values(&points),
    }
}
