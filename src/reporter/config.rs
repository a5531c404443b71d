use std::{fmt, sync::Arc, time::Duration};

use smallvec::SmallVec;

use crate::metrics::MetricKind;

pub type MetricFilter = Arc<dyn Fn(&str, MetricKind) -> bool + Send + Sync>;

const DEFAULT_PERCENTILES: [f64; 6] = [0.5, 0.75, 0.95, 0.98, 0.99, 0.999];
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How a [`crate::Reporter`] names, scales and filters what it sends.
#[derive(Clone)]
pub struct ReporterConfig {
    pub(crate) prefix: String,
    pub(crate) host_prefix: bool,
    pub(crate) rate_unit: Duration,
    pub(crate) duration_unit: Duration,
    pub(crate) percentiles: SmallVec<[f64; 8]>,
    pub(crate) timeout: Duration,
    pub(crate) filter: Option<MetricFilter>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self::new("")
    }
}

impl fmt::Debug for ReporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReporterConfig")
            .field("prefix", &self.prefix)
            .field("host_prefix", &self.host_prefix)
            .field("rate_unit", &self.rate_unit)
            .field("duration_unit", &self.duration_unit)
            .field("percentiles", &self.percentiles)
            .field("timeout", &self.timeout)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

impl ReporterConfig {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            host_prefix: false,
            rate_unit: Duration::from_secs(1),
            duration_unit: Duration::from_millis(1),
            percentiles: SmallVec::from_slice(&DEFAULT_PERCENTILES),
            timeout: DEFAULT_TIMEOUT,
            filter: None,
        }
    }

    /// Append the local hostname (dots replaced with `_`) to the prefix.
    pub fn with_host_prefix(mut self, enabled: bool) -> Self {
        self.host_prefix = enabled;
        self
    }

    /// Report meter and timer rates as events per `unit`. Zero is ignored.
    pub fn with_rate_unit(mut self, unit: Duration) -> Self {
        if unit.is_zero() {
            tracing::warn!(message = "ignoring zero rate unit");
        } else {
            self.rate_unit = unit;
        }
        self
    }

    /// Report timer durations in multiples of `unit`. Zero is ignored.
    pub fn with_duration_unit(mut self, unit: Duration) -> Self {
        if unit.is_zero() {
            tracing::warn!(message = "ignoring zero duration unit");
        } else {
            self.duration_unit = unit;
        }
        self
    }

    /// Quantiles reported for histograms and timers, each in `0.0..=1.0`.
    pub fn with_percentiles(mut self, percentiles: &[f64]) -> Self {
        self.percentiles = percentiles
            .iter()
            .copied()
            .filter(|q| (0.0..=1.0).contains(q))
            .collect();
        self
    }

    /// Upper bound on each `connect`, `send` and `close` call. Zero is
    /// ignored.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if timeout.is_zero() {
            tracing::warn!(message = "ignoring zero transport timeout");
        } else {
            self.timeout = timeout;
        }
        self
    }

    /// Only report metrics for which `filter(name, kind)` returns true.
    pub fn with_filter(
        mut self,
        filter: impl Fn(&str, MetricKind) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn percentiles(&self) -> &[f64] {
        &self.percentiles
    }

    pub(crate) fn matches(&self, name: &str, kind: MetricKind) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(name, kind))
    }

    /// The prefix actually put in front of every metric name.
    pub(crate) fn resolved_prefix(&self) -> String {
        if !self.host_prefix {
            return self.prefix.clone();
        }
        let host = gethostname::gethostname()
            .to_string_lossy()
            .replace('.', "_");
        if self.prefix.is_empty() {
            host
        } else {
            format!("{}.{}", self.prefix, host)
        }
    }
}
