use std::sync::{atomic, Arc};

/// A gauge is a read-only view onto some application value. The reporter
/// calls [`Gauge::value`] once per report cycle, from its own thread.
pub trait Gauge: Send + Sync + 'static {
    fn value(&self) -> i64;
}

impl<F> Gauge for F
where
    F: Fn() -> i64 + Send + Sync + 'static,
{
    fn value(&self) -> i64 {
        self()
    }
}

/// A settable gauge backed by a single atomic.
#[derive(Clone, Default, Debug)]
pub struct AtomicGauge {
    inner: Arc<atomic::AtomicI64>,
}

impl AtomicGauge {
    pub fn incr_by(&self, count: i64) {
        self.inner.fetch_add(count, atomic::Ordering::Relaxed);
    }

    pub fn incr(&self) {
        self.incr_by(1);
    }

    pub fn set(&self, val: i64) {
        self.inner.store(val, atomic::Ordering::Relaxed)
    }

    pub fn decr(&self) {
        self.incr_by(-1)
    }
}

impl Gauge for AtomicGauge {
    fn value(&self) -> i64 {
        self.inner.load(atomic::Ordering::Relaxed)
    }
}
