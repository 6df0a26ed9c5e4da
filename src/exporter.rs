use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::RwLock;
use tokio::select;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::accumulator::MetricAccumulator;
use crate::codec;
use crate::stats::Stats;
use crate::MetricName;

/// Ships one drained snapshot to a backend.
///
/// All error handling belongs inside the implementation, and the call must
/// not block the export pass; anything slow goes behind the
/// implementation's own queue. The stats may be `None` when the interval
/// saw no samples, and the implementation decides whether that is worth a
/// write at all.
pub trait SendAdapter: Send + Sync {
    fn send_metrics(&self, name: &str, time: SystemTime, stats: Option<Stats>);
}

/// Periodically drains a set of accumulators into a [`SendAdapter`].
pub struct ExportRunner<A> {
    interval: Duration,
    accumulators: RwLock<HashMap<MetricName, Arc<MetricAccumulator>>>,
    adapter: A,
}

impl<A: SendAdapter> ExportRunner<A> {
    pub fn new(interval: Duration, adapter: A) -> Self {
        Self {
            interval,
            accumulators: RwLock::new(HashMap::new()),
            adapter,
        }
    }

    pub fn register(&self, accumulator: Arc<MetricAccumulator>) {
        let mut accumulators = self.accumulators.write();
        accumulators.insert(accumulator.name().to_owned(), accumulator);
    }

    /// Drain every registered accumulator on a fixed cadence until
    /// `shutdown` fires. Each pass measures its own cost and sleeps that
    /// much less before the next one, so the cadence holds over time.
    pub async fn run(&self, shutdown: Arc<Semaphore>) {
        let mut adjustment = Duration::ZERO;
        loop {
            let sleep_for = self.interval.saturating_sub(adjustment);
            select! {
                () = tokio::time::sleep(sleep_for) => {}
                _ = shutdown.acquire() => break,
            }
            let pass_start = Instant::now();
            let collected_at = SystemTime::now();
            // snapshot the registry so no lock is held across the sends
            let accumulators: Vec<Arc<MetricAccumulator>> =
                self.accumulators.read().values().cloned().collect();
            for accumulator in accumulators {
                let stats = accumulator.sample_stats();
                self.adapter
                    .send_metrics(accumulator.name(), collected_at, stats);
            }
            adjustment = pass_start.elapsed();
            debug!(cost = ?adjustment, "export pass done");
        }
    }
}

/// Sends encoded stats to a metrics backend over HTTP, one POST per metric
/// per interval, with the metric name as the final path segment.
#[derive(Debug)]
pub struct HttpSendAdapter {
    client: ureq::Agent,
    base_url: String,
}

impl HttpSendAdapter {
    pub fn new(base_url: String) -> Self {
        let client = ureq::Agent::new();
        Self { client, base_url }
    }

    /// Blocking I/O
    fn post(&self, name: &str, bytes: &[u8]) -> anyhow::Result<()> {
        let url = format!("{}/{}", self.base_url, name);
        let _resp = self.client.post(&url).send_bytes(bytes)?;
        Ok(())
    }
}

impl SendAdapter for HttpSendAdapter {
    fn send_metrics(&self, name: &str, _time: SystemTime, stats: Option<Stats>) {
        let Some(stats) = stats else {
            return;
        };
        let bytes = codec::encode(&stats);
        if let Err(err) = self.post(name, &bytes) {
            warn!(metric = name, %err, "failed to ship metrics");
        }
    }
}
