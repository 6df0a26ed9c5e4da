/// Lower bounds in microseconds for logarithmic bin accumulation.
///
/// Three bins per decade, so successive bounds grow by roughly 3.162x. The
/// spread keeps both dynamic range and detail; real data sets populate it
/// sparsely. The wire format depends on these exact values.
pub const LOWER_BOUNDS: [u64; 19] = [
    0,
    3,
    10,            // 10 microseconds
    31,
    100,           // 100 microseconds
    316,
    1_000,         // 1 msec
    3_162,
    10_000,        // 10 msec
    31_622,
    100_000,       // 100 msec
    316_227,
    1_000_000,     // 1 second
    3_162_276,
    10_000_000,    // 10 seconds
    31_622_766,
    100_000_000,   // 100 seconds
    316_227_660,
    1_000_000_000, // 1000 seconds
];

pub const BIN_COUNT: usize = LOWER_BOUNDS.len();

/// Bin number for a time in microseconds: the greatest lower bound still
/// `<=` the value. The last bin has no upper bound, so everything past
/// `LOWER_BOUNDS[18]` lands there too.
pub fn bin_index(micros: u64) -> usize {
    LOWER_BOUNDS.partition_point(|&bound| bound <= micros) - 1
}
