use parking_lot::Mutex;

use crate::bins::{bin_index, BIN_COUNT};
use crate::stats::Stats;

/// Accumulates a logarithmic histogram of elapsed-time samples for one named
/// metric.
///
/// Consumers generally do not touch this directly; samplers feed it and the
/// export runner drains it. The in-progress cells are swapped out wholesale
/// on every drain, so a drained [`Stats`] is frozen the moment it leaves.
#[derive(Debug)]
pub struct MetricAccumulator {
    name: String,
    cells: Mutex<StatsCells>,
}

#[derive(Debug)]
struct StatsCells {
    counts: [u64; BIN_COUNT],
    totals: [u64; BIN_COUNT],
    sample_count: u64,
}

impl StatsCells {
    fn new() -> Self {
        Self {
            counts: [0; BIN_COUNT],
            totals: [0; BIN_COUNT],
            sample_count: 0,
        }
    }

    fn add_to_bin(&mut self, bin: usize, total: u64) {
        self.counts[bin] += 1;
        self.totals[bin] += total;
        self.sample_count += 1;
    }

    fn into_stats(self) -> Option<Stats> {
        if self.sample_count == 0 {
            return None;
        }
        Some(Stats::from_filled(
            self.counts.to_vec(),
            self.totals.to_vec(),
        ))
    }
}

impl MetricAccumulator {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        debug_assert!(!name.is_empty());
        Self {
            name,
            cells: Mutex::new(StatsCells::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record one sample in microseconds. The bin lookup runs outside the
    /// lock; only the cell additions are serialized.
    pub fn add_sample(&self, micros: u64) {
        let bin = bin_index(micros);
        self.cells.lock().add_to_bin(bin, micros);
    }

    /// Swap in fresh cells and hand back everything recorded since the last
    /// drain, or `None` when the interval saw no samples. Samples racing
    /// with the swap land on one side of it or the other, never both.
    pub fn sample_stats(&self) -> Option<Stats> {
        let drained = std::mem::replace(&mut *self.cells.lock(), StatsCells::new());
        drained.into_stats()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn name_is_stable() {
        let acc = MetricAccumulator::new("theName");
        assert_eq!(acc.name(), "theName");
    }

    #[test]
    fn no_samples_drains_to_none() {
        let acc = MetricAccumulator::new("theName");
        assert_eq!(acc.sample_stats(), None);
    }

    #[test]
    fn one_sample() {
        let acc = MetricAccumulator::new("theName");
        acc.add_sample(2);
        let stats = acc.sample_stats().unwrap();
        // the drain must have reset the cells
        assert_eq!(acc.sample_stats(), None);
        let mut expected_counts = [0u64; BIN_COUNT];
        let mut expected_totals = [0u64; BIN_COUNT];
        expected_counts[0] = 1;
        expected_totals[0] = 2;
        assert_eq!(stats.counts(), expected_counts);
        assert_eq!(stats.totals(), expected_totals);
    }

    #[test]
    fn two_samples_one_bin() {
        let acc = MetricAccumulator::new("theName");
        acc.add_sample(2);
        acc.add_sample(1);
        let stats = acc.sample_stats().unwrap();
        assert_eq!(acc.sample_stats(), None);
        assert_eq!(stats.counts()[0], 2);
        assert_eq!(stats.totals()[0], 3);
        assert!(stats.counts()[1..].iter().all(|&c| c == 0));
        assert!(stats.totals()[1..].iter().all(|&t| t == 0));
    }

    #[test]
    fn samples_spread_across_bins() {
        let acc = MetricAccumulator::new("spread");
        acc.add_sample(5); // bin 1
        acc.add_sample(1_000); // bin 6
        acc.add_sample(2_000_000_000); // bin 18
        let stats = acc.sample_stats().unwrap();
        assert_eq!(stats.counts()[1], 1);
        assert_eq!(stats.totals()[1], 5);
        assert_eq!(stats.counts()[6], 1);
        assert_eq!(stats.totals()[6], 1_000);
        assert_eq!(stats.counts()[18], 1);
        assert_eq!(stats.totals()[18], 2_000_000_000);
    }

    #[test]
    fn no_sample_lost_across_concurrent_drains() {
        let acc = Arc::new(MetricAccumulator::new("contended"));
        let writers: Vec<_> = (0..4)
            .map(|_| {
                let acc = acc.clone();
                std::thread::spawn(move || {
                    for _ in 0..10_000 {
                        acc.add_sample(7);
                    }
                })
            })
            .collect();
        let drainer = {
            let acc = acc.clone();
            std::thread::spawn(move || {
                let mut drained = 0u64;
                for _ in 0..100 {
                    if let Some(stats) = acc.sample_stats() {
                        drained += stats.counts().iter().sum::<u64>();
                    }
                    std::thread::yield_now();
                }
                drained
            })
        };
        for writer in writers {
            writer.join().unwrap();
        }
        let mut seen = drainer.join().unwrap();
        if let Some(stats) = acc.sample_stats() {
            seen += stats.counts().iter().sum::<u64>();
        }
        assert_eq!(seen, 40_000);
    }
}
