use std::time::{Duration, Instant};

use super::{Histogram, HistogramSnapshot, Meter, Metric, MetricKind, Registrable};

/// A histogram of durations (recorded in nanoseconds) paired with a meter of
/// how often the timed operation happens.
#[derive(Clone, Default, Debug)]
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
}

impl Timer {
    pub fn update(&self, duration: Duration) {
        self.histogram.record(duration.as_nanos() as f64);
        self.meter.mark();
    }

    /// Time a closure.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        f()
    }

    /// Start timing; the elapsed time is recorded when the guard drops.
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            timer: self,
            start: Instant::now(),
        }
    }

    pub fn count(&self) -> u64 {
        self.meter.count()
    }

    /// Duration statistics, in nanoseconds.
    pub fn snapshot(&self) -> HistogramSnapshot {
        self.histogram.snapshot()
    }

    pub fn meter(&self) -> &Meter {
        &self.meter
    }
}

#[must_use = "dropping the guard immediately records a near-zero duration"]
pub struct TimerGuard<'a> {
    timer: &'a Timer,
    start: Instant,
}

impl TimerGuard<'_> {
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.update(self.start.elapsed());
    }
}

impl Registrable for Timer {
    const KIND: MetricKind = MetricKind::Timer;

    fn create() -> Self {
        Self::default()
    }

    fn into_metric(self) -> Metric {
        Metric::Timer(self)
    }

    fn from_metric(metric: Metric) -> Option<Self> {
        match metric {
            Metric::Timer(t) => Some(t),
            _ => None,
        }
    }
}
