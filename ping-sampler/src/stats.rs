use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::record::Sample;

/// Lower bound for the standard deviation so constant series score 0, not NaN.
pub const STD_DEV_FLOOR: f64 = 1e-4;

/// The three metrics carried by every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    PacketLoss,
    AvgLatency,
    Jitter,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::PacketLoss, Metric::AvgLatency, Metric::Jitter];

    pub fn value(self, sample: &Sample) -> f64 {
        match self {
            Metric::PacketLoss => sample.packet_loss,
            Metric::AvgLatency => sample.avg_latency,
            Metric::Jitter => sample.jitter,
        }
    }

    /// Weight of the metric in the interest score. Loss spikes count triple.
    pub fn weight(self) -> f64 {
        match self {
            Metric::PacketLoss => 3.0,
            Metric::AvgLatency | Metric::Jitter => 1.0,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Metric::PacketLoss => "packet_loss",
            Metric::AvgLatency => "avg_latency",
            Metric::Jitter => "jitter",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Metric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "packet_loss" | "loss" => Ok(Metric::PacketLoss),
            "avg_latency" | "latency" => Ok(Metric::AvgLatency),
            "jitter" => Ok(Metric::Jitter),
            other => Err(anyhow!("unknown metric {:?}", other)),
        }
    }
}

/// Population statistics of one metric over a sample set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricStats {
    /// Compute mean, population standard deviation, min and max of `metric`.
    ///
    /// The standard deviation never drops below [`STD_DEV_FLOOR`]. An empty
    /// slice yields a zero mean and infinite min/max.
    pub fn compute(samples: &[Sample], metric: Metric) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self {
                mean: 0.0,
                std_dev: STD_DEV_FLOOR,
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            };
        }

        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in samples.iter().map(|s| metric.value(s)) {
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }
        let mean = sum / n as f64;

        let variance = samples
            .iter()
            .map(|s| {
                let d = metric.value(s) - mean;
                d * d
            })
            .sum::<f64>()
            / n as f64;

        Self {
            mean,
            std_dev: variance.sqrt().max(STD_DEV_FLOOR),
            min,
            max,
        }
    }

    pub fn z_score(&self, value: f64) -> f64 {
        (value - self.mean) / self.std_dev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn samples(losses: &[f64]) -> Vec<Sample> {
        losses
            .iter()
            .enumerate()
            .map(|(i, &loss)| {
                let ts = Utc.timestamp_opt(1_700_000_000 + i as i64 * 60, 0).unwrap();
                Sample::new(ts, loss, 10.0, 1.0)
            })
            .collect()
    }

    #[test]
    fn population_std_dev() {
        let stats = MetricStats::compute(
            &samples(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]),
            Metric::PacketLoss,
        );
        assert!((stats.mean - 5.0).abs() < 1e-9);
        assert!((stats.std_dev - 2.0).abs() < 1e-9);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
    }

    #[test]
    fn constant_metric_uses_floor() {
        let stats = MetricStats::compute(&samples(&[1.0, 1.0, 1.0]), Metric::AvgLatency);
        assert_eq!(stats.std_dev, STD_DEV_FLOOR);
        assert_eq!(stats.z_score(10.0), 0.0);
    }

    #[test]
    fn metric_names_parse() {
        assert_eq!("latency".parse::<Metric>().unwrap(), Metric::AvgLatency);
        assert_eq!("packet_loss".parse::<Metric>().unwrap(), Metric::PacketLoss);
        assert!("throughput".parse::<Metric>().is_err());
    }
}
