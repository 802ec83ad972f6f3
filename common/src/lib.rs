pub mod metrics;
pub mod tracer;

/// Scalar type used for every voltage, time and derived quantity.
pub type Real = f64;

/// Position of a sample within a trace or a sub-window of one.
pub type SampleIndex = usize;

pub type CellId = u32;
pub type ProtocolId = usize;

/// Acquisition frequency in samples per second.
pub type SampleRate = u32;

pub const MILLIS_PER_SECOND: Real = 1000.0;
