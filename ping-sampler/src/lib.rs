pub mod chart;
pub mod range;
pub mod record;
pub mod sampler;
pub mod service;
pub mod settings;
pub mod stats;
pub mod summary;

pub use chart::ChartSeries;
pub use record::{PingRecord, Sample};
pub use sampler::sample;
pub use service::Service;
pub use settings::{SettingsStore, Theme};
pub use stats::{Metric, MetricStats};
pub use summary::{LatencySummary, NetworkStats};
