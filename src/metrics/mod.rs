use std::{fmt, marker::PhantomData, sync::Arc};

use crate::{error::RegistryError, registry::Registry, DEFAULT_REGISTRY};

pub(crate) mod counter;
pub(crate) mod gauge;
pub(crate) mod histogram;
pub(crate) mod meter;
pub(crate) mod timer;

pub use counter::Counter;
pub use gauge::{AtomicGauge, Gauge};
pub use histogram::{Histogram, HistogramSnapshot};
pub use meter::Meter;
pub use timer::{Timer, TimerGuard};

/// The closed set of metric kinds a [`Registry`] can hold. The kind tag is what
/// the serializer dispatches on, and what the registry compares when the same
/// name is registered twice.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Meter,
    Timer,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Meter => "meter",
            MetricKind::Timer => "timer",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A handle to a registered metric. Every variant is a cheap clone that
/// shares its storage with the copy held by the registry.
#[derive(Clone)]
pub enum Metric {
    Counter(Counter),
    Gauge(Arc<dyn Gauge>),
    Histogram(Histogram),
    Meter(Meter),
    Timer(Timer),
}

impl Metric {
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Counter(_) => MetricKind::Counter,
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::Histogram(_) => MetricKind::Histogram,
            Metric::Meter(_) => MetricKind::Meter,
            Metric::Timer(_) => MetricKind::Timer,
        }
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Counter(c) => f.debug_tuple("Counter").field(&c.count()).finish(),
            Metric::Gauge(g) => f.debug_tuple("Gauge").field(&g.value()).finish(),
            Metric::Histogram(h) => f.debug_tuple("Histogram").field(&h.count()).finish(),
            Metric::Meter(m) => f.debug_tuple("Meter").field(&m.count()).finish(),
            Metric::Timer(t) => f.debug_tuple("Timer").field(&t.count()).finish(),
        }
    }
}

/// Metric types the registry knows how to construct on demand. Gauges are
/// missing on purpose: they wrap application state and are handed to
/// [`Registry::add_gauge`] instead.
pub trait Registrable: Clone + Sized {
    const KIND: MetricKind;

    fn create() -> Self;

    fn into_metric(self) -> Metric;

    fn from_metric(metric: Metric) -> Option<Self>;
}

/// A constant definition of a metric. Provides a single spot for naming a
/// metric at compile time; registration happens lazily at runtime.
pub struct MetricDef<M> {
    name: &'static str,
    _kind: PhantomData<M>,
}

impl<M: Registrable> MetricDef<M> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _kind: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fetch (or create) this metric in the [`DEFAULT_REGISTRY`]. Registering
    /// the same name with two different kinds is a programming error, so this
    /// panics on a [`RegistryError::KindMismatch`].
    pub fn must(&self) -> M {
        self.must_with_registry(&DEFAULT_REGISTRY)
    }

    #[doc(hidden)]
    pub fn must_with_registry(&self, registry: &Registry) -> M {
        self.try_register(registry)
            .unwrap_or_else(|e| panic!("failed to register metric definition: {e}"))
    }

    pub fn try_register(&self, registry: &Registry) -> Result<M, RegistryError> {
        registry.register::<M>(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CounterDef, HistogramDef, MeterDef, TimerDef};

    #[test]
    fn kind_display() {
        assert_eq!(MetricKind::Timer.to_string(), "timer");
        assert_eq!(Metric::Counter(Counter::default()).kind(), MetricKind::Counter);
    }

    #[test]
    fn def_registers_once() {
        const REQUESTS: CounterDef = CounterDef::new("metrics/tests/def_registers_once");
        let registry = Registry::new();
        let a = REQUESTS.must_with_registry(&registry);
        let b = REQUESTS.must_with_registry(&registry);
        a.incr_by(3);
        assert_eq!(b.count(), 3);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn def_kind_mismatch() {
        const AS_METER: MeterDef = MeterDef::new("shared");
        const AS_TIMER: TimerDef = TimerDef::new("shared");
        let registry = Registry::new();
        AS_METER.must_with_registry(&registry);
        let err = AS_TIMER.try_register(&registry).unwrap_err();
        assert_eq!(
            err,
            RegistryError::KindMismatch {
                name: "shared".into(),
                existing: MetricKind::Meter,
                requested: MetricKind::Timer,
            }
        );
    }

    #[test]
    #[should_panic(expected = "failed to register metric definition")]
    fn def_must_panics_on_mismatch() {
        const AS_COUNTER: CounterDef = CounterDef::new("shared");
        const AS_HISTOGRAM: HistogramDef = HistogramDef::new("shared");
        let registry = Registry::new();
        AS_COUNTER.must_with_registry(&registry);
        AS_HISTOGRAM.must_with_registry(&registry);
    }
}
