pub mod accumulator;
pub mod bins;
pub mod codec;
pub mod exporter;
pub mod sampler;
pub mod stats;

type MetricName = String;
