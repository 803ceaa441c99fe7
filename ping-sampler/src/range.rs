use log::debug;
use serde::Serialize;

use crate::record::Sample;

pub const DEFAULT_RANGE_HOURS: u32 = 3;

pub const UNAVAILABLE_HINT: &str = "Not enough data available for this time range";

/// A selectable chart range and the data span it needs before it is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub label: &'static str,
    pub hours: u32,
    pub min_data_span: u32,
}

pub const TIME_RANGES: [TimeRange; 5] = [
    TimeRange { label: "3 Hours", hours: 3, min_data_span: 0 },
    TimeRange { label: "12 Hours", hours: 12, min_data_span: 0 },
    TimeRange { label: "24 Hours", hours: 24, min_data_span: 11 },
    TimeRange { label: "3 Days", hours: 72, min_data_span: 23 },
    TimeRange { label: "7 Days", hours: 168, min_data_span: 71 },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRangeOption {
    #[serde(flatten)]
    pub range: TimeRange,
    pub available: bool,
    pub active: bool,
}

pub fn find_range(hours: u32) -> Option<&'static TimeRange> {
    TIME_RANGES.iter().find(|r| r.hours == hours)
}

/// Hours between the earliest and latest sample, `None` without samples.
pub fn data_span_hours(samples: &[Sample]) -> Option<f64> {
    let first = samples.iter().map(|s| s.timestamp).min()?;
    let last = samples.iter().map(|s| s.timestamp).max()?;
    Some((last - first).num_milliseconds() as f64 / 3_600_000.0)
}

/// Whether the range of `hours` may be selected for data spanning `span_hours`.
///
/// A missing or zero span disables every range.
pub fn is_available(hours: u32, span_hours: Option<f64>) -> bool {
    let span = match span_hours {
        Some(span) if span > 0.0 => span,
        _ => {
            debug!("time range {}h not available: no data span", hours);
            return false;
        }
    };

    let Some(range) = find_range(hours) else {
        debug!("time range {}h not available: option not found", hours);
        return false;
    };

    let available = span >= f64::from(range.min_data_span);
    debug!(
        "time range {}h: span {:.2}h, needs {}h, available {}",
        hours, span, range.min_data_span, available
    );
    available
}

pub fn unavailable_hint(hours: u32, span_hours: Option<f64>) -> Option<&'static str> {
    if is_available(hours, span_hours) {
        None
    } else {
        Some(UNAVAILABLE_HINT)
    }
}

/// The currently selected chart range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSelection {
    selected_hours: u32,
}

impl RangeSelection {
    pub fn new(default_hours: u32) -> Self {
        Self {
            selected_hours: default_hours,
        }
    }

    pub fn selected_hours(&self) -> u32 {
        self.selected_hours
    }

    /// Select `hours` if that range is available, returns whether it changed.
    pub fn select(&mut self, hours: u32, span_hours: Option<f64>) -> bool {
        if !is_available(hours, span_hours) {
            return false;
        }
        let changed = self.selected_hours != hours;
        self.selected_hours = hours;
        changed
    }

    pub fn options(&self, span_hours: Option<f64>) -> Vec<TimeRangeOption> {
        TIME_RANGES
            .iter()
            .map(|&range| TimeRangeOption {
                range,
                available: is_available(range.hours, span_hours),
                active: range.hours == self.selected_hours,
            })
            .collect()
    }
}

impl Default for RangeSelection {
    fn default() -> Self {
        Self::new(DEFAULT_RANGE_HOURS)
    }
}
