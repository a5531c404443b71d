use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use super::{Metric, MetricKind, Registrable};

const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// An exponentially-weighted moving average of a per-second rate, decayed
/// once per [`TICK_INTERVAL`].
#[derive(Debug)]
struct Ewma {
    alpha: f64,
    uncounted: AtomicU64,
    /// `None` until the first tick, which seeds the average directly.
    rate: Mutex<Option<f64>>,
}

impl Ewma {
    fn over_minutes(minutes: f64) -> Self {
        let window = minutes * 60.0;
        Self {
            alpha: 1.0 - (-TICK_INTERVAL.as_secs_f64() / window).exp(),
            uncounted: AtomicU64::new(0),
            rate: Mutex::new(None),
        }
    }

    fn update(&self, n: u64) {
        self.uncounted.fetch_add(n, Ordering::Relaxed);
    }

    fn tick(&self) {
        let count = self.uncounted.swap(0, Ordering::Relaxed);
        let instant = count as f64 / TICK_INTERVAL.as_secs_f64();
        let mut rate = self.rate.lock();
        *rate = Some(match *rate {
            Some(current) => current + self.alpha * (instant - current),
            None => instant,
        });
    }

    fn per_second(&self) -> f64 {
        self.rate.lock().unwrap_or(0.0)
    }
}

#[derive(Debug)]
struct MeterInner {
    count: AtomicU64,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
    start: Instant,
    /// Nanoseconds since `start` at which the averages were last ticked.
    last_tick: AtomicU64,
}

impl MeterInner {
    fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            m1: Ewma::over_minutes(1.0),
            m5: Ewma::over_minutes(5.0),
            m15: Ewma::over_minutes(15.0),
            start: Instant::now(),
            last_tick: AtomicU64::new(0),
        }
    }

    fn elapsed_nanos(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    /// Catch the moving averages up with wall time. Only the thread that wins
    /// the compare-exchange on `last_tick` does the ticking.
    fn tick_if_necessary(&self) {
        let tick = TICK_INTERVAL.as_nanos() as u64;
        let old = self.last_tick.load(Ordering::Acquire);
        let now = self.elapsed_nanos();
        let age = now.saturating_sub(old);
        if age < tick {
            return;
        }
        let new_tick = now - age % tick;
        if self
            .last_tick
            .compare_exchange(old, new_tick, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            for _ in 0..age / tick {
                self.m1.tick();
                self.m5.tick();
                self.m15.tick();
            }
        }
    }
}

/// Tracks how often something happens: a total count plus mean and
/// 1/5/15-minute moving-average rates, all in events per second.
#[derive(Clone, Debug)]
pub struct Meter {
    inner: Arc<MeterInner>,
}

impl Default for Meter {
    fn default() -> Self {
        Self {
            inner: Arc::new(MeterInner::new()),
        }
    }
}

impl Meter {
    pub fn mark_n(&self, n: u64) {
        self.inner.tick_if_necessary();
        self.inner.count.fetch_add(n, Ordering::Relaxed);
        self.inner.m1.update(n);
        self.inner.m5.update(n);
        self.inner.m15.update(n);
    }

    pub fn mark(&self) {
        self.mark_n(1);
    }

    pub fn count(&self) -> u64 {
        self.inner.count.load(Ordering::Relaxed)
    }

    pub fn mean_rate(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        let elapsed = self.inner.start.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        count as f64 / elapsed
    }

    pub fn one_minute_rate(&self) -> f64 {
        self.inner.tick_if_necessary();
        self.inner.m1.per_second()
    }

    pub fn five_minute_rate(&self) -> f64 {
        self.inner.tick_if_necessary();
        self.inner.m5.per_second()
    }

    pub fn fifteen_minute_rate(&self) -> f64 {
        self.inner.tick_if_necessary();
        self.inner.m15.per_second()
    }
}

impl Registrable for Meter {
    const KIND: MetricKind = MetricKind::Meter;

    fn create() -> Self {
        Self::default()
    }

    fn into_metric(self) -> Metric {
        Metric::Meter(self)
    }

    fn from_metric(metric: Metric) -> Option<Self> {
        match metric {
            Metric::Meter(m) => Some(m),
            _ => None,
        }
    }
}
