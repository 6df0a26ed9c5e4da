use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::accumulator::MetricAccumulator;

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_FOR_ROUND_EVEN: u64 = 499;
const NANOS_FOR_ROUND_ODD: u64 = 500;
const MICROS_PER_MILLI: i64 = 1_000;

#[derive(Debug, Clone, Copy)]
enum Started {
    /// High-resolution monotonic clock for spans that start and finish on
    /// the same logical thread of work.
    Monotonic(Instant),
    /// Coarse wall-clock milliseconds, safe to start on one thread and
    /// finish on another, e.g. across a queue hand-off.
    Wall(i64),
}

/// A single in-flight time sample.
///
/// Start one around the span to observe and `finish` it into the
/// accumulator it belongs to. A sampler that goes out of scope unfinished
/// delivers itself to the fallback accumulator it was started with instead,
/// exactly once either way.
#[derive(Debug)]
pub struct Sampler {
    started: Started,
    fallback: Option<Arc<MetricAccumulator>>,
}

impl Sampler {
    /// Start a high-resolution sample. `fallback` receives the sample if
    /// the span is abandoned before [`Sampler::finish`].
    pub fn start(fallback: Arc<MetricAccumulator>) -> Self {
        Self {
            started: Started::Monotonic(Instant::now()),
            fallback: Some(fallback),
        }
    }

    /// Start a cross-thread sample on the coarse wall clock. Expect biased
    /// results for spans shorter than a few milliseconds.
    pub fn start_cross_thread(fallback: Arc<MetricAccumulator>) -> Self {
        Self {
            started: Started::Wall(wall_millis()),
            fallback: Some(fallback),
        }
    }

    /// End the span and publish the elapsed time to `stats`. This is the
    /// normal completion path; the fallback is disarmed afterwards.
    pub fn finish(&mut self, stats: &MetricAccumulator) {
        let micros = match self.started {
            Started::Monotonic(begin) => micros_from_nanos(begin.elapsed().as_nanos() as u64),
            Started::Wall(begin) => micros_from_millis(wall_millis() - begin),
        };
        stats.add_sample(micros);
        self.fallback = None;
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        if let Some(fallback) = self.fallback.take() {
            self.finish(&fallback);
        }
    }
}

/// Round nanoseconds to microseconds, ties toward the even microsecond.
/// Plain truncation would bias a large sample population downward; always
/// rounding half up would bias it upward instead.
fn micros_from_nanos(nanos: u64) -> u64 {
    let micros = (nanos + NANOS_FOR_ROUND_EVEN) / NANOS_PER_MICRO;
    if micros % 2 == 1 {
        (nanos + NANOS_FOR_ROUND_ODD) / NANOS_PER_MICRO
    } else {
        micros
    }
}

/// A negative elapsed time means the wall clock was stepped backward
/// mid-span. There is no correct answer for that; 1 microsecond stands in
/// so the sample still lands in the lowest bin.
fn micros_from_millis(millis: i64) -> u64 {
    let micros = millis.saturating_mul(MICROS_PER_MILLI);
    if micros < 0 {
        1
    } else {
        micros as u64
    }
}

fn wall_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |since| since.as_millis() as i64)
}
