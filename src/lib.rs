//! In-process metrics with periodic Graphite reporting.
//!
//! Applications register counters, gauges, histograms, meters and timers in a
//! [`Registry`]. A [`Reporter`] owns a background thread that, once per
//! interval, snapshots the registry, flattens it into Graphite lines and pushes
//! them through a [`Sender`].
//!
//! ```no_run
//! use std::{sync::Arc, time::Duration};
//! use graphite64::{CounterDef, GraphiteSender, Reporter, ReporterConfig, DEFAULT_REGISTRY};
//!
//! const REQUESTS: CounterDef = CounterDef::new("http.requests");
//!
//! let reporter = Reporter::new(
//!     Arc::clone(&DEFAULT_REGISTRY),
//!     GraphiteSender::new("localhost:2003"),
//!     ReporterConfig::new("myapp"),
//! );
//! reporter.start(Duration::from_secs(10))?;
//! REQUESTS.must().incr();
//! reporter.stop()?;
//! # Ok::<(), graphite64::ReporterError>(())
//! ```

mod cmath;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod reporter;
pub mod sender;
pub mod serializer;
mod utils;

pub use error::{RegistryError, ReporterError, TransportError};
pub use metrics::{
    AtomicGauge, Counter, Gauge, Histogram, HistogramSnapshot, Meter, Metric, MetricDef,
    MetricKind, Timer, TimerGuard,
};
pub use registry::{Registry, DEFAULT_REGISTRY};
pub use reporter::{
    config::ReporterConfig, CycleOutcome, Reporter, ReporterState, ReporterStats, StatsSnapshot,
};
pub use sender::{graphite::GraphiteSender, Sender};
pub use serializer::{ReportEntry, Serializer};

pub type CounterDef = MetricDef<Counter>;
pub type HistogramDef = MetricDef<Histogram>;
pub type MeterDef = MetricDef<Meter>;
pub type TimerDef = MetricDef<Timer>;
