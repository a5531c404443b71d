use std::{
    f64::consts::{LN_2, LOG2_E},
    sync::{Arc, LazyLock},
    time::Duration,
};

use parking_lot::Mutex;

use super::{Metric, MetricKind, Registrable};
use crate::cmath::{frexp, ldexp};

const EXPO_MAX_SCALE: i32 = 20;
const EXPO_MIN_SCALE: i32 = -10;
const DEFAULT_MAX_SIZE: i64 = 160;

/// `2^scale / ln(2)` for every positive scale, used to map a value's mantissa
/// onto a sub-bucket.
static SCALE_FACTORS: LazyLock<[f64; EXPO_MAX_SCALE as usize + 1]> =
    LazyLock::new(|| std::array::from_fn(|scale| ldexp(LOG2_E, scale as isize)));

/// The log-exponential histogram described by otel. Bucket boundaries sit at
/// powers of `base = 2 ^ (2 ^ -scale)`; when the observed range no longer fits
/// in `max_size` buckets the scale drops and neighbouring buckets merge.
#[derive(Debug)]
struct HistogramInner {
    count: u64,
    min: f64,
    max: f64,
    sum: f64,
    /// Running mean and sum of squared deviations (Welford).
    mean: f64,
    m2: f64,
    zero_count: u64,
    max_size: i64,
    scale: i32,
    positive: HistogramBuckets,
    negative: HistogramBuckets,
}

impl Default for HistogramInner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE, EXPO_MAX_SCALE)
    }
}

impl HistogramInner {
    fn new(max_size: i64, max_scale: i32) -> Self {
        Self {
            count: 0,
            min: f64::MAX,
            max: f64::MIN,
            sum: 0f64,
            mean: 0f64,
            m2: 0f64,
            zero_count: 0,
            max_size,
            scale: max_scale,
            positive: HistogramBuckets::default(),
            negative: HistogramBuckets::default(),
        }
    }

    /// Map a positive value onto its bucket index at the current scale.
    fn get_bin(&self, value: f64) -> i32 {
        let (frac, exp) = frexp(value);
        let exp = exp as i32;
        if self.scale <= 0 {
            // frexp's exponent is one too high, and two too high for exact
            // powers of two where the fraction comes back as 0.5.
            let correction = if frac == 0.5 { 2 } else { 1 };
            (exp - correction) >> (-self.scale)
        } else {
            (exp << self.scale) + ((frac.ln() * SCALE_FACTORS[self.scale as usize]) as i32) - 1
        }
    }

    /// How many halvings of the scale are needed before `bin` fits next to the
    /// buckets already in use. Zero means it fits as-is.
    fn scale_delta(&self, bin: i32, buckets: &HistogramBuckets) -> i32 {
        if buckets.counts.is_empty() {
            return 0;
        }
        let end_bin = buckets.start_bin + buckets.counts.len() as i32 - 1;
        let (mut low, mut high) = (bin.min(buckets.start_bin), bin.max(end_bin));
        let mut delta = 0i32;
        while high as i64 - low as i64 >= self.max_size {
            low >>= 1;
            high >>= 1;
            delta += 1;
            if delta > EXPO_MAX_SCALE - EXPO_MIN_SCALE {
                break;
            }
        }
        delta
    }

    fn record(&mut self, value: f64) {
        if !value.is_finite() {
            tracing::warn!(message = "dropping non-finite histogram sample", value);
            return;
        }
        let abs_value = value.abs();
        if abs_value == 0.0 {
            self.zero_count += 1;
        } else {
            let negative = value < 0f64;
            let mut bin = self.get_bin(abs_value);
            let buckets = if negative { &self.negative } else { &self.positive };
            let delta = self.scale_delta(bin, buckets);
            if delta != 0 {
                if self.scale - delta < EXPO_MIN_SCALE {
                    // Only reachable with a max_size of 1.
                    tracing::error!("exponential histogram scale underflow");
                    return;
                }
                self.scale -= delta;
                self.positive.downscale(delta);
                self.negative.downscale(delta);
                bin = self.get_bin(abs_value);
            }
            if negative {
                self.negative.record(bin);
            } else {
                self.positive.record(bin);
            }
        }

        self.count += 1;
        self.sum += value;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        debug_assert_eq!(
            self.positive.total() + self.negative.total() + self.zero_count,
            self.count,
            "combined buckets sum must equal total count"
        );
    }

    fn snapshot(&self) -> HistogramSnapshot {
        let (min, max) = if self.count == 0 {
            (0f64, 0f64)
        } else {
            (self.min, self.max)
        };
        HistogramSnapshot {
            count: self.count,
            min,
            max,
            sum: self.sum,
            mean: self.mean,
            m2: self.m2,
            zero_count: self.zero_count,
            scale: self.scale,
            positive: self.positive.clone(),
            negative: self.negative.clone(),
        }
    }
}

#[derive(Default, Debug, Clone)]
struct HistogramBuckets {
    /// Bucket index of `counts[0]`.
    start_bin: i32,
    /// `counts[i]` holds values in `(base^(start_bin+i), base^(start_bin+i+1)]`.
    counts: Vec<u64>,
}

impl HistogramBuckets {
    fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    fn record(&mut self, bin: i32) {
        if self.counts.is_empty() {
            self.start_bin = bin;
            self.counts.push(1);
            return;
        }
        let end_bin = self.start_bin + self.counts.len() as i32 - 1;
        if bin < self.start_bin {
            // Grow at the front: shift the existing counts right by the gap.
            let shift = (self.start_bin - bin) as usize;
            let orig_len = self.counts.len();
            self.counts.resize(orig_len + shift, 0);
            self.counts.copy_within(0..orig_len, shift);
            self.counts[..shift].fill(0);
            self.start_bin = bin;
        } else if bin > end_bin {
            self.counts.resize((bin - self.start_bin + 1) as usize, 0);
        }
        self.counts[(bin - self.start_bin) as usize] += 1;
    }

    /// Merge every `2^delta` neighbouring buckets into one.
    fn downscale(&mut self, delta: i32) {
        if self.counts.len() <= 1 || delta < 1 {
            self.start_bin >>= delta;
            return;
        }
        let steps = 1i32 << delta;
        // Position of start_bin inside its merged group, always positive.
        let offset = self.start_bin.rem_euclid(steps);
        for index in 1..self.counts.len() {
            let idx = index as i32 + offset;
            let target = (idx / steps) as usize;
            if idx % steps == 0 {
                self.counts[target] = self.counts[index];
            } else {
                self.counts[target] += self.counts[index];
            }
        }
        let last = (self.counts.len() - 1 + offset as usize) / steps as usize;
        self.counts.truncate(last + 1);
        self.start_bin >>= delta;
    }
}

/// A point-in-time copy of a [`Histogram`], taken under its lock so every
/// statistic describes the same set of samples.
#[derive(Debug, Clone)]
pub struct HistogramSnapshot {
    count: u64,
    min: f64,
    max: f64,
    sum: f64,
    mean: f64,
    m2: f64,
    zero_count: u64,
    scale: i32,
    positive: HistogramBuckets,
    negative: HistogramBuckets,
}

impl HistogramSnapshot {
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation.
    pub fn stddev(&self) -> f64 {
        if self.count <= 1 {
            return 0.0;
        }
        (self.m2 / (self.count - 1) as f64).max(0.0).sqrt()
    }

    /// Estimate the value at quantile `q` (0.0..=1.0). The answer is the
    /// geometric midpoint of the bucket holding that rank, clamped to the
    /// observed min/max.
    pub fn quantile(&self, q: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let rank = ((q.clamp(0.0, 1.0) * self.count as f64).ceil() as u64).max(1);
        // ln(base)
        let factor = ldexp(LN_2, -self.scale as isize);
        let midpoint = |bin: i32| (factor * (bin as f64 + 0.5)).exp();

        let mut seen = 0u64;
        // Negative buckets are keyed by magnitude, so the most negative
        // values live at the end.
        for (index, count) in self.negative.counts.iter().enumerate().rev() {
            seen += count;
            if seen >= rank {
                let bin = self.negative.start_bin + index as i32;
                return self.clamp(-midpoint(bin));
            }
        }
        seen += self.zero_count;
        if seen >= rank {
            return self.clamp(0.0);
        }
        for (index, count) in self.positive.counts.iter().enumerate() {
            seen += count;
            if seen >= rank {
                let bin = self.positive.start_bin + index as i32;
                return self.clamp(midpoint(bin));
            }
        }
        self.max
    }

    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// A threadsafe histogram for tracking the distribution of values in an
/// efficient way. Samples accumulate for the life of the histogram.
#[derive(Default, Clone, Debug)]
pub struct Histogram {
    inner: Arc<Mutex<HistogramInner>>,
}

impl Histogram {
    pub fn record(&self, value: f64) {
        self.inner.lock().record(value);
    }

    pub fn record_duration_ms(&self, value: Duration) {
        self.record(value.as_secs_f64() * 1_000.0);
    }

    pub fn count(&self) -> u64 {
        self.inner.lock().count
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        self.inner.lock().snapshot()
    }
}

impl Registrable for Histogram {
    const KIND: MetricKind = MetricKind::Histogram;

    fn create() -> Self {
        Self::default()
    }

    fn into_metric(self) -> Metric {
        Metric::Histogram(self)
    }

    fn from_metric(metric: Metric) -> Option<Self> {
        match metric {
            Metric::Histogram(h) => Some(h),
            _ => None,
        }
    }
}
