//! Push a handful of metrics to a Graphite listener on localhost:2003 every
//! second. `nc -lk 2003` is enough to watch the lines arrive.
use std::{sync::Arc, time::Duration};

use graphite64::{
    AtomicGauge, CounterDef, GraphiteSender, Reporter, ReporterConfig, TimerDef, DEFAULT_REGISTRY,
};

const REQUESTS: CounterDef = CounterDef::new("demo.requests");
const LATENCY: TimerDef = TimerDef::new("demo.latency");

pub fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let in_flight = AtomicGauge::default();
    DEFAULT_REGISTRY.add_gauge("demo.in_flight", in_flight.clone())?;

    let reporter = Reporter::new(
        Arc::clone(&DEFAULT_REGISTRY),
        GraphiteSender::new("127.0.0.1:2003"),
        ReporterConfig::new("graphite64").with_host_prefix(true),
    );
    reporter.start(Duration::from_secs(1))?;

    let requests = REQUESTS.must();
    let latency = LATENCY.must();
    for i in 0..100u64 {
        in_flight.incr();
        latency.time(|| std::thread::sleep(Duration::from_millis(10 + i % 40)));
        requests.incr();
        in_flight.decr();
    }

    reporter.stop()?;
    tracing::info!(stats = ?reporter.stats(), "done");
    Ok(())
}
