use std::sync::{atomic, Arc};

use super::{Metric, MetricKind, Registrable};

/// A cumulative up/down counter. Unlike a delta counter the value is not
/// reset when the reporter reads it, so every flush carries the running total.
#[derive(Clone, Default, Debug)]
pub struct Counter {
    inner: Arc<atomic::AtomicI64>,
}

impl Counter {
    pub fn new(initial: i64) -> Self {
        Self {
            inner: Arc::new(atomic::AtomicI64::new(initial)),
        }
    }

    pub fn incr_by(&self, count: i64) {
        self.inner.fetch_add(count, atomic::Ordering::Relaxed);
    }

    pub fn incr(&self) {
        self.incr_by(1);
    }

    pub fn decr_by(&self, count: i64) {
        self.inner.fetch_sub(count, atomic::Ordering::Relaxed);
    }

    pub fn decr(&self) {
        self.decr_by(1);
    }

    pub fn set(&self, count: i64) {
        self.inner.store(count, atomic::Ordering::Relaxed);
    }

    /// Same as `set(0)`.
    pub fn clear(&self) {
        self.set(0);
    }

    pub fn count(&self) -> i64 {
        self.inner.load(atomic::Ordering::Relaxed)
    }
}

impl Registrable for Counter {
    const KIND: MetricKind = MetricKind::Counter;

    fn create() -> Self {
        Self::default()
    }

    fn into_metric(self) -> Metric {
        Metric::Counter(self)
    }

    fn from_metric(metric: Metric) -> Option<Self> {
        match metric {
            Metric::Counter(c) => Some(c),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::Counter;

    #[test]
    fn set_and_clear() {
        let counter = Counter::new(7);
        counter.incr();
        counter.decr_by(3);
        assert_eq!(counter.count(), 5);
        counter.set(-2);
        assert_eq!(counter.count(), -2);
        counter.clear();
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let counter = Counter::default();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        if i % 2 == 0 {
                            counter.incr_by(3);
                        } else {
                            counter.decr();
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        // 4 threads adding 30_000 each, 4 threads removing 10_000 each.
        assert_eq!(counter.count(), 4 * 30_000 - 4 * 10_000);
    }
}
