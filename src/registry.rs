use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::{Arc, LazyLock};

use crate::{
    error::RegistryError,
    metrics::{Counter, Gauge, Histogram, Meter, Metric, MetricKind, Registrable, Timer},
    utils::BuildNameHasher,
};

/// The process-wide registry used by [`crate::MetricDef::must`].
pub static DEFAULT_REGISTRY: LazyLock<Arc<Registry>> = LazyLock::new(|| Arc::new(Registry::new()));

/// A point-in-time list of registered metrics, sorted by name.
pub type Snapshot = Vec<(String, Metric)>;

/// A concurrent map of metric name to metric. Lookups and inserts lock a
/// single shard of the map, so registering metrics from many threads never
/// serializes on one lock, and a snapshot never sees a half-inserted entry.
#[derive(Default)]
pub struct Registry {
    metrics: DashMap<String, Metric, BuildNameHasher>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            metrics: DashMap::with_hasher(BuildNameHasher),
        }
    }

    /// Return the metric registered under `name`, or build one with `factory`
    /// and register it. Concurrent callers racing on the same name all get the
    /// same instance; `factory` runs at most once per name and must not call
    /// back into this registry.
    pub fn get_or_create<M: Registrable>(
        &self,
        name: &str,
        factory: impl FnOnce() -> M,
    ) -> Result<M, RegistryError> {
        // Fast path: the metric is usually already there and a read avoids
        // allocating an owned key.
        if let Some(existing) = self.metrics.get(name) {
            return downcast(name, existing.value());
        }
        match self.metrics.entry(name.to_owned()) {
            Entry::Occupied(entry) => downcast(name, entry.get()),
            Entry::Vacant(entry) => {
                let metric = factory();
                entry.insert(metric.clone().into_metric());
                tracing::debug!(message = "registered metric", name, kind = %M::KIND);
                Ok(metric)
            }
        }
    }

    pub fn register<M: Registrable>(&self, name: &str) -> Result<M, RegistryError> {
        self.get_or_create(name, M::create)
    }

    pub fn counter(&self, name: &str) -> Result<Counter, RegistryError> {
        self.register(name)
    }

    pub fn histogram(&self, name: &str) -> Result<Histogram, RegistryError> {
        self.register(name)
    }

    pub fn meter(&self, name: &str) -> Result<Meter, RegistryError> {
        self.register(name)
    }

    pub fn timer(&self, name: &str) -> Result<Timer, RegistryError> {
        self.register(name)
    }

    /// Register an application-provided gauge. If a gauge already exists under
    /// `name` it is kept and returned, and `gauge` is dropped.
    pub fn add_gauge<G: Gauge>(&self, name: &str, gauge: G) -> Result<Arc<dyn Gauge>, RegistryError> {
        match self.metrics.entry(name.to_owned()) {
            Entry::Occupied(entry) => match entry.get() {
                Metric::Gauge(existing) => Ok(existing.clone()),
                other => Err(RegistryError::KindMismatch {
                    name: name.to_owned(),
                    existing: other.kind(),
                    requested: MetricKind::Gauge,
                }),
            },
            Entry::Vacant(entry) => {
                let gauge: Arc<dyn Gauge> = Arc::new(gauge);
                entry.insert(Metric::Gauge(gauge.clone()));
                tracing::debug!(message = "registered metric", name, kind = %MetricKind::Gauge);
                Ok(gauge)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Metric> {
        self.metrics.get(name).map(|m| m.value().clone())
    }

    /// Unregister `name`. Handles already held by the application keep
    /// working but are no longer reported.
    pub fn remove(&self, name: &str) -> Option<Metric> {
        self.metrics.remove(name).map(|(_, metric)| metric)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_matching(|_, _| true)
    }

    /// Snapshot only the metrics for which `filter(name, kind)` holds.
    pub fn snapshot_matching(&self, filter: impl Fn(&str, MetricKind) -> bool) -> Snapshot {
        let mut snapshot: Snapshot = self
            .metrics
            .iter()
            .filter(|entry| filter(entry.key(), entry.value().kind()))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        snapshot.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
        snapshot
    }
}

fn downcast<M: Registrable>(name: &str, metric: &Metric) -> Result<M, RegistryError> {
    M::from_metric(metric.clone()).ok_or_else(|| RegistryError::KindMismatch {
        name: name.to_owned(),
        existing: metric.kind(),
        requested: M::KIND,
    })
}
