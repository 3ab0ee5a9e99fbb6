pub mod collector;
pub mod config;
pub mod error;
pub mod meter;
pub mod metrics;
pub mod model;
pub mod platform;
pub mod registry;
pub mod reporter;
pub mod scheduler;
pub mod sink;

pub use collector::Collector;
pub use config::{CliConfig, Config, SyslogConfig};
pub use error::{AgentError, Result};
pub use meter::{DeltaMeter, Meter, MeterKind, MetricValue, RawValue, SnapshotMeter, ValueKind};
pub use metrics::SystemCollector;
pub use model::*;
pub use platform::PlatformProvider;
pub use registry::MetricRegistry;
pub use reporter::{CycleOutcome, Reporter};
pub use scheduler::{Scheduler, SchedulerState};
pub use sink::Sink;
