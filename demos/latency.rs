use std::sync::Arc;
use std::time::{Duration, SystemTime};

use timebin::accumulator::MetricAccumulator;
use timebin::exporter::{ExportRunner, SendAdapter};
use timebin::sampler::Sampler;
use timebin::stats::Stats;
use tokio::sync::Semaphore;

struct StdoutAdapter;

impl SendAdapter for StdoutAdapter {
    fn send_metrics(&self, name: &str, _time: SystemTime, stats: Option<Stats>) {
        match stats {
            Some(stats) => println!("{name}: counts={:?}", stats.counts()),
            None => println!("{name}: idle"),
        }
    }
}

#[tokio::main]
async fn main() {
    let ok = Arc::new(MetricAccumulator::new("demo.ok"));
    let errors = Arc::new(MetricAccumulator::new("demo.error"));

    let runner = Arc::new(ExportRunner::new(Duration::from_millis(500), StdoutAdapter));
    runner.register(ok.clone());
    runner.register(errors.clone());

    let shutdown = Arc::new(Semaphore::new(0));
    let run = tokio::spawn({
        let runner = runner.clone();
        let shutdown = shutdown.clone();
        async move { runner.run(shutdown).await }
    });

    for round in 0..20u64 {
        let mut sample = Sampler::start(errors.clone());
        let work = Duration::from_micros(round * 50);
        tokio::time::sleep(work).await;
        if round % 7 == 0 {
            // abandoned on purpose; the drop feeds demo.error
            println!("round {round} abandoned");
        } else {
            sample.finish(&ok);
            println!("round {round} took about {}", humantime::format_duration(work));
        }
    }

    tokio::time::sleep(Duration::from_secs(1)).await;
    shutdown.add_permits(1);
    run.await.unwrap();
}
