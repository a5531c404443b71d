use std::{
    fmt,
    future::Future,
    mem,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use parking_lot::Mutex;
use tokio::{
    runtime::{self, Handle, Runtime},
    sync::oneshot,
    time::{Instant, Interval, MissedTickBehavior},
};

use crate::{
    error::{ReporterError, TransportError},
    metrics::{Counter, Histogram, HistogramSnapshot},
    registry::Registry,
    sender::Sender,
    serializer::Serializer,
};

pub mod config;

use config::ReporterConfig;

/// Where a [`Reporter`] is in its lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReporterState {
    Idle,
    Running,
    /// `stop()` is waiting for the background thread to finish.
    Stopping,
}

/// What happened during one report cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Success { sent: usize },
    /// Connected, but at least one send or the close failed.
    Degraded { sent: usize, failed: usize },
    /// Nothing was sent and `close` was not called.
    ConnectFailed,
}

/// Uses a wall-clock base captured once plus a monotonic offset, so
/// timestamps never go backwards if the system clock is stepped after the
/// first report.
#[derive(Copy, Clone)]
struct StartTs {
    instant: Instant,
    unix_secs: u64,
}

impl StartTs {
    fn new() -> Self {
        Self {
            instant: Instant::now(),
            unix_secs: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }

    fn now(&self) -> u64 {
        self.unix_secs + self.instant.elapsed().as_secs()
    }
}

/// Counters describing the reporter itself. These live outside the registry
/// being reported so they never show up in the backend by accident.
#[derive(Default)]
pub struct ReporterStats {
    succeeded: Counter,
    degraded: Counter,
    connect_failed: Counter,
    panicked: Counter,
    entries_sent: Counter,
    send_failures: Counter,
    cycle_latency_ms: Histogram,
    last_outcome: Mutex<Option<CycleOutcome>>,
}

#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub succeeded: i64,
    pub degraded: i64,
    pub connect_failed: i64,
    pub panicked: i64,
    pub entries_sent: i64,
    pub send_failures: i64,
    pub cycle_latency_ms: HistogramSnapshot,
    pub last_outcome: Option<CycleOutcome>,
}

impl StatsSnapshot {
    pub fn cycles(&self) -> i64 {
        self.succeeded + self.degraded + self.connect_failed + self.panicked
    }
}

impl ReporterStats {
    fn record(&self, outcome: CycleOutcome, elapsed: Duration) -> CycleOutcome {
        match outcome {
            CycleOutcome::Success { sent } => {
                self.succeeded.incr();
                self.entries_sent.incr_by(sent as i64);
            }
            CycleOutcome::Degraded { sent, failed } => {
                self.degraded.incr();
                self.entries_sent.incr_by(sent as i64);
                self.send_failures.incr_by(failed as i64);
            }
            CycleOutcome::ConnectFailed => self.connect_failed.incr(),
        }
        self.cycle_latency_ms.record_duration_ms(elapsed);
        *self.last_outcome.lock() = Some(outcome);
        outcome
    }

    fn record_panic(&self) {
        self.panicked.incr();
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            succeeded: self.succeeded.count(),
            degraded: self.degraded.count(),
            connect_failed: self.connect_failed.count(),
            panicked: self.panicked.count(),
            entries_sent: self.entries_sent.count(),
            send_failures: self.send_failures.count(),
            cycle_latency_ms: self.cycle_latency_ms.snapshot(),
            last_outcome: *self.last_outcome.lock(),
        }
    }
}

/// Everything one report cycle needs. Owned by exactly one thread at a time:
/// the caller of [`Reporter::report_once`] while idle, the background thread
/// while running.
struct Worker {
    registry: Arc<Registry>,
    sender: Box<dyn Sender>,
    serializer: Serializer,
    config: ReporterConfig,
    start_ts: Option<StartTs>,
    stats: Arc<ReporterStats>,
}

impl Worker {
    async fn report(&mut self) -> CycleOutcome {
        let started = Instant::now();
        let timestamp = self.start_ts.get_or_insert_with(StartTs::new).now();
        let config = &self.config;
        let snapshot = self
            .registry
            .snapshot_matching(|name, kind| config.matches(name, kind));
        let entries = self.serializer.serialize(&snapshot, timestamp);
        tracing::debug!(
            message = "collected metrics",
            timestamp,
            metrics = snapshot.len(),
            entries = entries.len(),
            duration = ?started.elapsed()
        );

        let timeout = self.config.timeout;
        if let Err(e) = bounded("connect", timeout, self.sender.connect()).await {
            tracing::error!(message = "failed to connect to metrics backend", error = %e);
            return self.stats.record(CycleOutcome::ConnectFailed, started.elapsed());
        }

        let mut failed = 0;
        for entry in &entries {
            let send = self
                .sender
                .send(&entry.name, &entry.value, entry.timestamp, entry.kind);
            if let Err(e) = bounded("send", timeout, send).await {
                failed += 1;
                tracing::warn!(message = "failed to send metric", name = %entry.name, error = %e);
            }
        }
        let sent = entries.len() - failed;

        let closed = bounded("close", timeout, self.sender.close()).await;
        if let Err(e) = &closed {
            tracing::error!(message = "failed to close metrics backend connection", error = %e);
        }

        let outcome = if failed == 0 && closed.is_ok() {
            CycleOutcome::Success { sent }
        } else {
            tracing::warn!(message = "report cycle degraded", sent, failed);
            CycleOutcome::Degraded { sent, failed }
        };
        self.stats.record(outcome, started.elapsed())
    }
}

/// Run `fut` for at most `after`; running out of time is a transport error.
async fn bounded<F>(op: &'static str, after: Duration, fut: F) -> Result<(), TransportError>
where
    F: Future<Output = Result<(), TransportError>>,
{
    tokio::time::timeout(after, fut)
        .await
        .unwrap_or_else(|_| Err(TransportError::Timeout { op, after }))
}

struct Running {
    shutdown: oneshot::Sender<()>,
    thread: JoinHandle<Option<Box<Worker>>>,
}

enum State {
    Idle(Box<Worker>),
    Running(Running),
    Stopping,
    /// The background thread died and took the sender with it.
    Lost,
}

/// Periodically pushes every metric in a [`Registry`] through a [`Sender`].
///
/// While running, a dedicated thread ticks every `interval` and runs one
/// report cycle per tick: snapshot, `connect`, one `send` per value, `close`.
/// Cycles never overlap; a tick that arrives while a cycle is still running
/// is skipped. Transport failures are logged and counted in
/// [`Reporter::stats`], never returned to the application.
pub struct Reporter {
    state: Mutex<State>,
    stats: Arc<ReporterStats>,
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Reporter {
    pub fn new(registry: Arc<Registry>, sender: impl Sender, config: ReporterConfig) -> Self {
        let stats = Arc::new(ReporterStats::default());
        let worker = Worker {
            registry,
            sender: Box::new(sender),
            serializer: Serializer::new(&config),
            config,
            start_ts: None,
            stats: stats.clone(),
        };
        Self {
            state: Mutex::new(State::Idle(Box::new(worker))),
            stats,
        }
    }

    pub fn state(&self) -> ReporterState {
        match &*self.state.lock() {
            State::Idle(_) | State::Lost => ReporterState::Idle,
            State::Running(_) => ReporterState::Running,
            State::Stopping => ReporterState::Stopping,
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Start reporting every `interval`. The first cycle runs one full
    /// interval after this call.
    pub fn start(&self, interval: Duration) -> Result<(), ReporterError> {
        self.start_on(
            interval,
            thread::Builder::new().name("graphite64-reporter".into()),
        )
    }

    fn start_on(&self, interval: Duration, builder: thread::Builder) -> Result<(), ReporterError> {
        if interval.is_zero() {
            return Err(ReporterError::InvalidInterval);
        }
        let mut state = self.state.lock();
        let worker = match mem::replace(&mut *state, State::Lost) {
            State::Idle(worker) => worker,
            other => {
                let err = misuse(&other, ReporterError::AlreadyRunning);
                *state = other;
                return Err(err);
            }
        };
        let runtime = match build_runtime() {
            Ok(runtime) => runtime,
            Err(e) => {
                *state = State::Idle(worker);
                return Err(ReporterError::Runtime(e));
            }
        };
        let (shutdown, shutdown_rx) = oneshot::channel();
        let prefix = worker.serializer.prefix().to_owned();
        // The worker is handed over only once the thread exists, so a failed
        // spawn leaves it with us.
        let (handoff, handoff_rx) = oneshot::channel::<Box<Worker>>();
        let thread = match builder.spawn(move || {
            let worker = handoff_rx.blocking_recv().ok()?;
            Some(run(runtime, worker, interval, shutdown_rx))
        }) {
            Ok(thread) => thread,
            Err(e) => {
                tracing::error!(message = "failed to spawn metrics reporter thread", error = %e);
                *state = State::Idle(worker);
                return Err(ReporterError::Spawn(e));
            }
        };
        if let Err(worker) = handoff.send(worker) {
            *state = State::Idle(worker);
            let _ = thread.join();
            return Err(ReporterError::WorkerLost);
        }
        *state = State::Running(Running { shutdown, thread });
        tracing::info!(message = "started metrics reporter", interval = ?interval, prefix = %prefix);
        Ok(())
    }

    /// Stop reporting. Blocks until an in-flight cycle has finished; no cycle
    /// starts after this returns.
    pub fn stop(&self) -> Result<(), ReporterError> {
        let running = {
            let mut state = self.state.lock();
            match mem::replace(&mut *state, State::Stopping) {
                State::Running(running) => running,
                other => {
                    *state = other;
                    return Err(ReporterError::NotRunning);
                }
            }
        };
        // The receiver only disappears if the thread is already gone, which
        // join reports below.
        let _ = running.shutdown.send(());
        let next = match running.thread.join() {
            Ok(Some(worker)) => State::Idle(worker),
            Ok(None) => State::Lost,
            Err(_) => {
                tracing::error!(message = "metrics reporter thread panicked");
                State::Lost
            }
        };
        *self.state.lock() = next;
        tracing::info!(message = "stopped metrics reporter");
        Ok(())
    }

    /// Run a single report cycle on the calling thread. Only allowed while
    /// idle, and must not be called from inside an async runtime.
    pub fn report_once(&self) -> Result<CycleOutcome, ReporterError> {
        let mut state = self.state.lock();
        let worker = match &mut *state {
            State::Idle(worker) => worker,
            other => return Err(misuse(other, ReporterError::AlreadyRunning)),
        };
        if Handle::try_current().is_ok() {
            return Err(ReporterError::InsideRuntime);
        }
        let runtime = build_runtime().map_err(ReporterError::Runtime)?;
        Ok(runtime.block_on(worker.report()))
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if self.state() == ReporterState::Running {
            let _ = self.stop();
        }
    }
}

fn misuse(state: &State, otherwise: ReporterError) -> ReporterError {
    match state {
        State::Lost => ReporterError::WorkerLost,
        State::Running(_) | State::Stopping => ReporterError::AlreadyRunning,
        State::Idle(_) => otherwise,
    }
}

fn build_runtime() -> std::io::Result<Runtime> {
    runtime::Builder::new_current_thread().enable_all().build()
}

/// Body of the background thread. Returns the worker so the reporter can be
/// restarted with the same sender.
fn run(
    runtime: Runtime,
    mut worker: Box<Worker>,
    interval: Duration,
    mut shutdown: oneshot::Receiver<()>,
) -> Box<Worker> {
    let mut ticker = runtime.block_on(async {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    });
    loop {
        let tick = runtime.block_on(async {
            tokio::select! {
                biased;
                _ = &mut shutdown => None,
                at = ticker.tick() => Some(at),
            }
        });
        let Some(tick) = tick else {
            break;
        };
        let cycle = panic::catch_unwind(AssertUnwindSafe(|| runtime.block_on(worker.report())));
        if cycle.is_err() {
            worker.stats.record_panic();
            tracing::error!(message = "report cycle panicked, continuing on next tick");
        }
        let _enter = runtime.enter();
        skip_overdue(&mut ticker, tick, interval);
    }
    worker
}

/// After a cycle that ran past the next tick, move the ticker to the first
/// boundary still ahead so the overdue tick never fires. Boundaries stay on
/// the original `tick + k * interval` grid.
fn skip_overdue(ticker: &mut Interval, tick: Instant, interval: Duration) {
    let elapsed = Instant::now().saturating_duration_since(tick);
    if elapsed < interval {
        return;
    }
    let periods = u32::try_from(elapsed.as_nanos() / interval.as_nanos() + 1).unwrap_or(u32::MAX);
    tracing::warn!(
        message = "report cycle overran its interval, skipping ticks",
        elapsed = ?elapsed,
        skipped = periods - 1
    );
    match interval.checked_mul(periods).and_then(|ahead| tick.checked_add(ahead)) {
        Some(next) => ticker.reset_at(next),
        None => ticker.reset(),
    }
}

#[cfg(test)]
mod tests {
    use std::{thread::sleep, time::Duration};

    use super::*;
    use crate::{
        metrics::MetricKind,
        sender::{
            graphite::GraphiteSender,
            testing::{Call, RecordingSender},
        },
    };

    fn reporter_with(registry: &Arc<Registry>, prefix: &str) -> (Reporter, RecordingSender) {
        let sender = RecordingSender::default();
        let reporter = Reporter::new(
            registry.clone(),
            sender.clone(),
            ReporterConfig::new(prefix),
        );
        (reporter, sender)
    }

    #[test]
    fn one_tick_sends_counter() {
        let registry = Arc::new(Registry::new());
        registry.counter("Counter").unwrap().incr_by(100);
        let (reporter, sender) = reporter_with(&registry, "Prefix");

        reporter.start(Duration::from_millis(100)).unwrap();
        sleep(Duration::from_millis(150));
        reporter.stop().unwrap();

        let calls = sender.calls();
        assert!(calls.len() >= 3, "expected one cycle, got {calls:?}");
        assert_eq!(calls[0], Call::Connect);
        match &calls[1] {
            Call::Send {
                name,
                value,
                timestamp,
                kind,
            } => {
                assert_eq!(name, "Prefix.Counter.count");
                assert_eq!(value, "100");
                assert_eq!(*kind, MetricKind::Counter);
                assert!(*timestamp > 1_600_000_000);
            }
            other => panic!("expected send, got {other:?}"),
        }
        assert_eq!(calls[2], Call::Close);
        sender.assert_well_ordered();
        assert_eq!(reporter.state(), ReporterState::Idle);
    }

    #[test]
    fn stop_before_first_tick_is_prompt() {
        let registry = Arc::new(Registry::new());
        registry.counter("Counter").unwrap();
        let (reporter, sender) = reporter_with(&registry, "");

        let begin = Instant::now();
        reporter.start(Duration::from_secs(30)).unwrap();
        reporter.stop().unwrap();
        assert!(begin.elapsed() < Duration::from_secs(5));
        assert!(sender.calls().is_empty());
        assert_eq!(reporter.stats().cycles(), 0);
    }

    #[test]
    fn connect_failure_skips_cycle_and_keeps_ticking() {
        let registry = Arc::new(Registry::new());
        registry.counter("Counter").unwrap();
        let (reporter, sender) = reporter_with(&registry, "");
        sender.fail_connect(true);

        reporter.start(Duration::from_millis(20)).unwrap();
        sleep(Duration::from_millis(150));
        reporter.stop().unwrap();

        let calls = sender.calls();
        assert!(calls.len() >= 2, "expected several ticks, got {calls:?}");
        assert!(calls.iter().all(|c| *c == Call::Connect));
        let stats = reporter.stats();
        assert_eq!(stats.connect_failed, calls.len() as i64);
        assert_eq!(stats.last_outcome, Some(CycleOutcome::ConnectFailed));
    }

    #[test]
    fn failed_send_still_sends_rest_and_closes() {
        let registry = Arc::new(Registry::new());
        for name in ["a", "b", "c"] {
            registry.counter(name).unwrap();
        }
        let (reporter, sender) = reporter_with(&registry, "");
        sender.fail_send_of("a.count");

        let outcome = reporter.report_once().unwrap();
        assert_eq!(outcome, CycleOutcome::Degraded { sent: 2, failed: 1 });
        let names: Vec<_> = sender
            .calls()
            .into_iter()
            .map(|call| match call {
                Call::Connect => "connect".to_owned(),
                Call::Send { name, .. } => name,
                Call::Close => "close".to_owned(),
            })
            .collect();
        assert_eq!(names, ["connect", "a.count", "b.count", "c.count", "close"]);
        let stats = reporter.stats();
        assert_eq!(stats.degraded, 1);
        assert_eq!(stats.send_failures, 1);
        assert_eq!(stats.entries_sent, 2);
    }

    #[test]
    fn entries_in_a_cycle_share_a_timestamp() {
        let registry = Arc::new(Registry::new());
        registry.histogram("h").unwrap().record(1.0);
        registry.timer("t").unwrap().update(Duration::from_millis(1));
        registry.meter("m").unwrap().mark();
        let (reporter, sender) = reporter_with(&registry, "app");

        assert!(matches!(
            reporter.report_once().unwrap(),
            CycleOutcome::Success { .. }
        ));
        let timestamps: Vec<u64> = sender
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send { timestamp, .. } => Some(timestamp),
                _ => None,
            })
            .collect();
        assert!(timestamps.len() > 10);
        assert!(timestamps.iter().all(|ts| *ts == timestamps[0]));
    }

    #[test]
    fn lifecycle_misuse() {
        let registry = Arc::new(Registry::new());
        let (reporter, _sender) = reporter_with(&registry, "");

        assert!(matches!(reporter.stop(), Err(ReporterError::NotRunning)));
        assert!(matches!(
            reporter.start(Duration::ZERO),
            Err(ReporterError::InvalidInterval)
        ));
        reporter.start(Duration::from_secs(30)).unwrap();
        assert_eq!(reporter.state(), ReporterState::Running);
        assert!(matches!(
            reporter.start(Duration::from_secs(1)),
            Err(ReporterError::AlreadyRunning)
        ));
        assert!(matches!(
            reporter.report_once(),
            Err(ReporterError::AlreadyRunning)
        ));
        reporter.stop().unwrap();
        assert!(matches!(reporter.stop(), Err(ReporterError::NotRunning)));

        // restartable with the same sender
        reporter.start(Duration::from_secs(30)).unwrap();
        reporter.stop().unwrap();
    }

    #[test]
    fn slow_cycles_never_overlap() {
        let registry = Arc::new(Registry::new());
        registry.counter("Counter").unwrap();
        let (reporter, sender) = reporter_with(&registry, "");
        sender.connect_delay(Duration::from_millis(50));

        reporter.start(Duration::from_millis(10)).unwrap();
        sleep(Duration::from_millis(200));
        reporter.stop().unwrap();

        assert!(!sender.overlapped());
        sender.assert_well_ordered();
        // stop waited for the in-flight cycle to close
        assert_eq!(sender.calls().last(), Some(&Call::Close));
        assert!(sender.connects() <= 200 / 50 + 1);
    }

    #[test]
    fn overrunning_cycle_skips_the_next_tick() {
        let registry = Arc::new(Registry::new());
        registry.counter("Counter").unwrap();
        let (reporter, sender) = reporter_with(&registry, "");
        sender.connect_delay(Duration::from_millis(150));

        reporter.start(Duration::from_millis(100)).unwrap();
        sleep(Duration::from_millis(1000));
        reporter.stop().unwrap();

        // Ticks at 100, 300, 500, ... ms: each 150ms cycle swallows the
        // tick after it.
        let starts = sender.connected_at();
        assert!(
            (3..=5).contains(&starts.len()),
            "unexpected cycle count {}",
            starts.len()
        );
        for pair in starts.windows(2) {
            let gap = pair[1].duration_since(pair[0]).as_millis();
            assert!(gap >= 180, "cycle started {gap}ms after the previous one");
            let off_grid = gap % 100;
            assert!(
                off_grid <= 30 || off_grid >= 70,
                "cycle start drifted off the interval grid: {gap}ms"
            );
        }
        assert!(!sender.overlapped());
        sender.assert_well_ordered();
    }

    #[test]
    fn failed_spawn_keeps_the_sender() {
        let registry = Arc::new(Registry::new());
        registry.counter("Counter").unwrap();
        let (reporter, sender) = reporter_with(&registry, "");

        // No address space can hold a 1 PiB stack.
        let oversized = thread::Builder::new().stack_size(1 << 50);
        assert!(matches!(
            reporter.start_on(Duration::from_millis(10), oversized),
            Err(ReporterError::Spawn(_))
        ));
        assert_eq!(reporter.state(), ReporterState::Idle);

        assert_eq!(
            reporter.report_once().unwrap(),
            CycleOutcome::Success { sent: 1 }
        );
        reporter.start(Duration::from_secs(30)).unwrap();
        reporter.stop().unwrap();
        assert_eq!(sender.connects(), 1);
    }

    #[tokio::test]
    async fn report_once_refuses_inside_a_runtime() {
        let registry = Arc::new(Registry::new());
        registry.counter("Counter").unwrap();
        let (reporter, sender) = reporter_with(&registry, "");

        assert!(matches!(
            reporter.report_once(),
            Err(ReporterError::InsideRuntime)
        ));
        assert!(sender.calls().is_empty());
        assert_eq!(reporter.state(), ReporterState::Idle);
    }

    #[test]
    fn panicking_cycle_does_not_kill_the_loop() {
        let registry = Arc::new(Registry::new());
        registry.counter("Counter").unwrap();
        let (reporter, sender) = reporter_with(&registry, "");
        sender.panic_on_connect(true);

        reporter.start(Duration::from_millis(20)).unwrap();
        sleep(Duration::from_millis(100));
        sender.panic_on_connect(false);
        sleep(Duration::from_millis(100));
        reporter.stop().unwrap();

        let stats = reporter.stats();
        assert!(stats.panicked >= 1);
        assert!(stats.succeeded >= 1);
        assert!(sender.calls().contains(&Call::Close));
        assert_eq!(reporter.state(), ReporterState::Idle);
    }

    #[test]
    fn slow_connect_times_out() {
        let registry = Arc::new(Registry::new());
        let sender = RecordingSender::default();
        sender.connect_delay(Duration::from_millis(500));
        let reporter = Reporter::new(
            registry,
            sender.clone(),
            ReporterConfig::new("").with_timeout(Duration::from_millis(20)),
        );
        assert_eq!(reporter.report_once().unwrap(), CycleOutcome::ConnectFailed);
        assert_eq!(sender.calls(), vec![Call::Connect]);
    }

    #[test]
    fn drop_stops_the_thread() {
        let registry = Arc::new(Registry::new());
        registry.counter("Counter").unwrap();
        let (reporter, sender) = reporter_with(&registry, "");
        reporter.start(Duration::from_millis(10)).unwrap();
        sleep(Duration::from_millis(50));
        drop(reporter);
        let after_drop = sender.calls().len();
        sleep(Duration::from_millis(50));
        assert_eq!(sender.calls().len(), after_drop);
        sender.assert_well_ordered();
    }

    #[test]
    fn filter_limits_reported_metrics() {
        let registry = Arc::new(Registry::new());
        registry.counter("keep").unwrap();
        registry.counter("skip").unwrap();
        let sender = RecordingSender::default();
        let reporter = Reporter::new(
            registry,
            sender.clone(),
            ReporterConfig::new("").with_filter(|name, _| name != "skip"),
        );
        assert_eq!(
            reporter.report_once().unwrap(),
            CycleOutcome::Success { sent: 1 }
        );
    }

    #[test]
    fn graphite_wire_format() -> anyhow::Result<()> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let registry = Arc::new(Registry::new());
        registry.counter("Counter").unwrap().incr_by(100);
        registry.add_gauge("Gauge", || 100i64).unwrap();
        let reporter = Reporter::new(
            registry,
            GraphiteSender::new(addr.to_string()),
            ReporterConfig::new("Prefix"),
        );

        assert_eq!(reporter.report_once()?, CycleOutcome::Success { sent: 2 });

        let (mut socket, _) = listener.accept()?;
        let mut received = String::new();
        std::io::Read::read_to_string(&mut socket, &mut received)?;
        let lines: Vec<Vec<&str>> = received
            .lines()
            .map(|l| l.split(' ').collect())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0][..2], ["Prefix.Counter.count", "100"]);
        assert_eq!(lines[1][..2], ["Prefix.Gauge", "100"]);
        assert_eq!(lines[0][2], lines[1][2]);
        Ok(())
    }
}
