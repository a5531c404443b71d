//! Flattening of a registry snapshot into Graphite-style name/value pairs.

use smallvec::SmallVec;

use crate::{
    metrics::{HistogramSnapshot, Meter, Metric, MetricKind},
    reporter::config::ReporterConfig,
};

/// One value to send: a fully-qualified name, the rendered value, the cycle
/// timestamp in unix seconds and the kind of metric it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub name: String,
    pub value: String,
    pub timestamp: u64,
    pub kind: MetricKind,
}

/// Turns metrics into [`ReportEntry`]s. Names are
/// `prefix.metric[.suffix]`; integers render as-is and floats with two
/// decimals, so the output never depends on locale.
#[derive(Debug, Clone)]
pub struct Serializer {
    prefix: String,
    /// seconds per configured rate unit
    rate_factor: f64,
    /// nanoseconds per configured duration unit
    duration_nanos: f64,
    percentiles: SmallVec<[(f64, String); 8]>,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new(&ReporterConfig::default())
    }
}

impl Serializer {
    pub fn new(config: &ReporterConfig) -> Self {
        Self {
            prefix: config.resolved_prefix(),
            rate_factor: config.rate_unit.as_secs_f64(),
            duration_nanos: config.duration_unit.as_nanos() as f64,
            percentiles: config
                .percentiles
                .iter()
                .map(|&q| (q, percentile_suffix(q)))
                .collect(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Flatten `snapshot` in order. Every entry carries the same `timestamp`.
    pub fn serialize(&self, snapshot: &[(String, Metric)], timestamp: u64) -> Vec<ReportEntry> {
        let mut entries = Vec::with_capacity(snapshot.len() * 4);
        for (name, metric) in snapshot {
            self.serialize_metric(&mut entries, name, metric, timestamp);
        }
        entries
    }

    fn serialize_metric(
        &self,
        out: &mut Vec<ReportEntry>,
        name: &str,
        metric: &Metric,
        timestamp: u64,
    ) {
        let mut emit = |suffix: Option<&str>, value: String| {
            out.push(ReportEntry {
                name: self.full_name(name, suffix),
                value,
                timestamp,
                kind: metric.kind(),
            })
        };
        match metric {
            Metric::Counter(counter) => emit(Some("count"), counter.count().to_string()),
            Metric::Gauge(gauge) => emit(None, gauge.value().to_string()),
            Metric::Histogram(histogram) => {
                let snapshot = histogram.snapshot();
                emit(Some("count"), snapshot.count().to_string());
                self.distribution(&mut emit, &snapshot, 1.0);
            }
            Metric::Meter(meter) => self.rates(&mut emit, meter),
            Metric::Timer(timer) => {
                self.distribution(&mut emit, &timer.snapshot(), self.duration_nanos);
                self.rates(&mut emit, timer.meter());
            }
        }
    }

    /// max, mean, min, stddev and percentiles, with every value divided by
    /// `scale`.
    fn distribution(
        &self,
        emit: &mut impl FnMut(Option<&str>, String),
        snapshot: &HistogramSnapshot,
        scale: f64,
    ) {
        emit(Some("max"), format_float(snapshot.max() / scale));
        emit(Some("mean"), format_float(snapshot.mean() / scale));
        emit(Some("min"), format_float(snapshot.min() / scale));
        emit(Some("stddev"), format_float(snapshot.stddev() / scale));
        for (q, suffix) in &self.percentiles {
            emit(Some(suffix.as_str()), format_float(snapshot.quantile(*q) / scale));
        }
    }

    fn rates(&self, emit: &mut impl FnMut(Option<&str>, String), meter: &Meter) {
        emit(Some("count"), meter.count().to_string());
        emit(Some("m1_rate"), format_float(meter.one_minute_rate() * self.rate_factor));
        emit(Some("m5_rate"), format_float(meter.five_minute_rate() * self.rate_factor));
        emit(Some("m15_rate"), format_float(meter.fifteen_minute_rate() * self.rate_factor));
        emit(Some("mean_rate"), format_float(meter.mean_rate() * self.rate_factor));
    }

    fn full_name(&self, name: &str, suffix: Option<&str>) -> String {
        let mut full = String::with_capacity(self.prefix.len() + name.len() + 16);
        if !self.prefix.is_empty() {
            full.push_str(&self.prefix);
            full.push('.');
        }
        full.push_str(name);
        if let Some(suffix) = suffix {
            full.push('.');
            full.push_str(suffix);
        }
        full
    }
}

fn format_float(value: f64) -> String {
    format!("{value:.2}")
}

/// 0.5 -> `p50`, 0.999 -> `p999`
fn percentile_suffix(q: f64) -> String {
    let percent = format!("{:.4}", q * 100.0);
    let percent = percent.trim_end_matches('0').trim_end_matches('.');
    format!("p{}", percent.replace('.', ""))
}
