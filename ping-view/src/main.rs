use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone, Utc};
use clap::Parser;
use log::{info, warn};
use ping_sampler::chart::ChartSeries;
use ping_sampler::range::TimeRangeOption;
use ping_sampler::record::{self, PingRecord};
use ping_sampler::{Metric, NetworkStats, Service, SettingsStore, Theme};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;

/// Reduce ping results to chart series ready for display.
#[derive(Parser, Debug)]
#[command(name = "ping-view", version)]
struct Args {
    /// JSON array of ping records, `-` reads stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Most points a chart may hold before the sampler kicks in
    #[arg(short = 'n', long, env = "PING_TARGET_COUNT", default_value_t = ping_sampler::service::DEFAULT_DISPLAY_BUDGET)]
    target_count: usize,

    /// Newest records considered per fetch
    #[arg(long, env = "PING_LIMIT", default_value_t = ping_sampler::service::DEFAULT_LIMIT)]
    limit: usize,

    /// Chart range in hours (3, 12, 24, 72 or 168)
    #[arg(short, long)]
    range: Option<u32>,

    /// Only chart this metric (packet_loss, avg_latency, jitter)
    #[arg(short, long)]
    metric: Option<Metric>,

    /// Reference time for windows, RFC 3339; defaults to now
    #[arg(long)]
    now: Option<String>,

    /// Emit the sampled records instead of chart series
    #[arg(long)]
    raw: bool,

    /// Settings file holding the theme preference
    #[arg(long, env = "PING_SETTINGS", default_value = "ping-view.json")]
    settings: PathBuf,

    /// Save a theme preference (light or dark)
    #[arg(long)]
    theme: Option<Theme>,
}

#[derive(Serialize)]
struct ViewResponse {
    theme: Theme,
    selected_hours: u32,
    sample_count: usize,
    ranges: Vec<TimeRangeOption>,
    charts: BTreeMap<Metric, ChartSeries>,
    /// Time of the newest probe in the local zone
    latest_at: Option<String>,
    stats: Option<NetworkStats>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut settings = SettingsStore::open(&args.settings, None)?;
    if let Some(theme) = args.theme {
        settings.set_theme(theme)?;
        info!("saved theme {} to {}", theme, settings.path().display());
    }

    let now = match &args.now {
        Some(raw) => record::parse_utc_timestamp(raw)?,
        None => Utc::now(),
    };

    let mut svc = Service::new(args.limit, args.target_count);
    let count = svc.ingest_json(&read_input(&args.input)?)?;
    info!("read {} ping records from {}", count, args.input);

    if let Some(hours) = args.range {
        if !svc.select_range(hours) && svc.selected_hours() != hours {
            warn!(
                "{}h range not selectable: {}",
                hours,
                ping_sampler::range::UNAVAILABLE_HINT
            );
        }
    }

    let out = std::io::stdout().lock();
    if args.raw {
        let records = raw_records(&svc, now);
        serde_json::to_writer_pretty(out, &records)?;
    } else {
        let metrics = match args.metric {
            Some(metric) => vec![metric],
            None => Metric::ALL.to_vec(),
        };
        let charts = metrics
            .into_iter()
            .map(|m| (m, svc.chart(now, m, &Local)))
            .collect();

        let stats = svc.stats(now);
        let response = ViewResponse {
            theme: settings.theme(),
            selected_hours: svc.selected_hours(),
            sample_count: svc.samples().len(),
            ranges: svc.range_options(),
            charts,
            latest_at: latest_at(stats.as_ref(), &Local),
            stats,
        };
        serde_json::to_writer_pretty(out, &response)?;
    }
    println!();

    Ok(())
}

fn latest_at<Tz: TimeZone>(stats: Option<&NetworkStats>, tz: &Tz) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    stats.map(|s| record::format_display(&s.latest.timestamp, tz))
}

fn raw_records(svc: &Service, now: DateTime<Utc>) -> Vec<PingRecord> {
    svc.display_series(now, i64::from(svc.selected_hours()))
        .iter()
        .map(PingRecord::from)
        .collect()
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read ping records from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(input).with_context(|| format!("failed to read {}", input))
}
