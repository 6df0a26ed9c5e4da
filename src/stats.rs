use thiserror::Error;

use crate::bins::BIN_COUNT;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("Length of counts is {len} but we expected {}", BIN_COUNT)]
    CountsLength { len: usize },
    #[error("Length of totals is {len} but we expected {}", BIN_COUNT)]
    TotalsLength { len: usize },
}

/// One drained interval of binned statistics: how many samples landed in
/// each bin and the sum of the raw microsecond values per bin. Immutable
/// once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    counts: Vec<u64>,
    totals: Vec<u64>,
}

impl Stats {
    pub fn new(counts: Vec<u64>, totals: Vec<u64>) -> Result<Self, StatsError> {
        if counts.len() != BIN_COUNT {
            return Err(StatsError::CountsLength { len: counts.len() });
        }
        if totals.len() != BIN_COUNT {
            return Err(StatsError::TotalsLength { len: totals.len() });
        }
        Ok(Self { counts, totals })
    }

    /// Internal constructor for sequences already sized to the bin table.
    pub(crate) fn from_filled(counts: Vec<u64>, totals: Vec<u64>) -> Self {
        debug_assert_eq!(counts.len(), BIN_COUNT);
        debug_assert_eq!(totals.len(), BIN_COUNT);
        Self { counts, totals }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn totals(&self) -> &[u64] {
        &self.totals
    }
}
