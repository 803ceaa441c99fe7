use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A ping result as served by the backend API.
///
/// Only `timestamp`, `packet_loss`, `avg_latency` and `jitter` take part in
/// sampling. `min_latency` and `max_latency` feed the window statistics, the
/// remaining columns are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingRecord {
    pub timestamp: String,
    pub packet_loss: f64,
    pub avg_latency: f64,
    pub jitter: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_latency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_latency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packets_sent: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packets_received: Option<u32>,
}

/// One ping probe measurement at a UTC instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PingRecord")]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub packet_loss: f64,
    pub avg_latency: f64,
    pub jitter: f64,
    /// Fastest and slowest reply of the probe, when the backend reports them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_latency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_latency: Option<f64>,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, packet_loss: f64, avg_latency: f64, jitter: f64) -> Self {
        Self {
            timestamp,
            packet_loss,
            avg_latency,
            jitter,
            min_latency: None,
            max_latency: None,
        }
    }

    pub fn with_latency_range(mut self, min_latency: Option<f64>, max_latency: Option<f64>) -> Self {
        self.min_latency = min_latency;
        self.max_latency = max_latency;
        self
    }

    /// Lowest latency seen by the probe, `avg_latency` when not reported.
    pub fn min_latency_or_avg(&self) -> f64 {
        self.min_latency.unwrap_or(self.avg_latency)
    }

    /// Highest latency seen by the probe, `avg_latency` when not reported.
    pub fn max_latency_or_avg(&self) -> f64 {
        self.max_latency.unwrap_or(self.avg_latency)
    }

    /// Like [`Sample::new`] but refuses NaN and infinite metric values.
    pub fn checked(
        timestamp: DateTime<Utc>,
        packet_loss: f64,
        avg_latency: f64,
        jitter: f64,
    ) -> Result<Self> {
        for (name, value) in [
            ("packet_loss", packet_loss),
            ("avg_latency", avg_latency),
            ("jitter", jitter),
        ] {
            if !value.is_finite() {
                bail!("{} at {} is not a finite number: {}", name, timestamp, value);
            }
        }

        Ok(Self::new(timestamp, packet_loss, avg_latency, jitter))
    }
}

impl TryFrom<PingRecord> for Sample {
    type Error = anyhow::Error;

    fn try_from(record: PingRecord) -> Result<Self> {
        let timestamp = parse_utc_timestamp(&record.timestamp)?;
        for (name, value) in [
            ("min_latency", record.min_latency),
            ("max_latency", record.max_latency),
        ] {
            if let Some(v) = value.filter(|v| !v.is_finite()) {
                bail!("{} at {} is not a finite number: {}", name, timestamp, v);
            }
        }

        let sample = Sample::checked(
            timestamp,
            record.packet_loss,
            record.avg_latency,
            record.jitter,
        )?;
        Ok(sample.with_latency_range(record.min_latency, record.max_latency))
    }
}

impl From<&Sample> for PingRecord {
    fn from(sample: &Sample) -> Self {
        PingRecord {
            timestamp: sample.timestamp.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
            packet_loss: sample.packet_loss,
            avg_latency: sample.avg_latency,
            jitter: sample.jitter,
            id: None,
            target: None,
            min_latency: sample.min_latency,
            max_latency: sample.max_latency,
            packets_sent: None,
            packets_received: None,
        }
    }
}

/// Parse an ISO-8601 timestamp, treating strings without a zone as UTC.
///
/// The backend writes naive `isoformat()` strings, so `2024-05-01T12:00:00`
/// and `2024-05-01T12:00:00Z` name the same instant.
pub fn parse_utc_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .with_context(|| format!("invalid timestamp {:?}", raw))
}

/// Render an instant as a local date and time string in `tz`.
pub fn format_display<Tz: TimeZone>(ts: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ts.with_timezone(tz).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Decode a JSON array of ping records into validated samples.
pub fn samples_from_json(json: &str) -> Result<Vec<Sample>> {
    let records: Vec<PingRecord> =
        serde_json::from_str(json).context("failed to decode ping records")?;

    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            Sample::try_from(record).with_context(|| format!("ping record #{} rejected", i))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn naive_timestamps_are_utc() {
        let naive = parse_utc_timestamp("2024-05-01T12:30:00.250000").unwrap();
        let zulu = parse_utc_timestamp("2024-05-01T12:30:00.25Z").unwrap();
        assert_eq!(naive, zulu);
        assert_eq!(naive, Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap() + chrono::Duration::milliseconds(250));
    }

    #[test]
    fn offsets_are_respected() {
        let ts = parse_utc_timestamp("2024-05-01T14:00:00+02:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn garbage_timestamp_is_an_error() {
        assert!(parse_utc_timestamp("yesterday").is_err());
    }

    #[test]
    fn non_finite_metrics_are_rejected() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        assert!(Sample::checked(ts, f64::NAN, 10.0, 1.0).is_err());
        assert!(Sample::checked(ts, 0.0, f64::INFINITY, 1.0).is_err());
        assert!(Sample::checked(ts, 0.0, 10.0, f64::NEG_INFINITY).is_err());
        assert!(Sample::checked(ts, 0.0, 10.0, 1.0).is_ok());
    }

    #[test]
    fn decodes_backend_payload() {
        let json = r#"[
            {"id": 7, "timestamp": "2024-05-01T12:00:00", "target": "1.1.1.1",
             "packet_loss": 1.0, "min_latency": 9.5, "max_latency": 14.0,
             "avg_latency": 11.2, "jitter": 0.8, "packets_sent": 100, "packets_received": 99},
            {"timestamp": "2024-05-01T12:05:00Z", "packet_loss": 0.0, "avg_latency": 10.0, "jitter": 0.5}
        ]"#;

        let samples = samples_from_json(json).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].avg_latency, 11.2);
        assert_eq!(samples[0].min_latency, Some(9.5));
        assert_eq!(samples[0].max_latency, Some(14.0));
        assert_eq!(samples[1].min_latency, None);
        assert_eq!(samples[1].max_latency_or_avg(), 10.0);
        assert_eq!(samples[1].timestamp, Utc.with_ymd_and_hms(2024, 5, 1, 12, 5, 0).unwrap());
    }

    #[test]
    fn bad_record_reports_its_position() {
        let json = r#"[
            {"timestamp": "2024-05-01T12:00:00", "packet_loss": 0.0, "avg_latency": 10.0, "jitter": 0.5},
            {"timestamp": "not a time", "packet_loss": 0.0, "avg_latency": 10.0, "jitter": 0.5}
        ]"#;

        let err = samples_from_json(json).unwrap_err();
        assert!(format!("{:#}", err).contains("#1"));
    }

    #[test]
    fn record_round_trip_keeps_zulu_suffix() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = PingRecord::from(&Sample::new(ts, 0.5, 12.0, 1.0));
        assert_eq!(record.timestamp, "2024-05-01T12:00:00Z");
    }

    #[test]
    fn display_uses_the_given_zone() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 23, 15, 0).unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(format_display(&ts, &plus_two), "2024-05-02 01:15:00");
    }
}
