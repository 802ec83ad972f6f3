//! Tools for locating and describing the peaks of a voltage trace.
//!
//! A window of a trace is a slice of voltages sampled at a uniform period.
//! Typical usage looks like:
//! ```rust,ignore
//! let detector = BaselineRelativeDetector::new(&BaselineRelativeParameters::default());
//! let peaks = detector.describe_peaks(&window, None)?;     // every peak, first-found first
//! let rise = compute_derivative_info(&window, period, 25.0, period * 1000.0, false);
//! ```

pub(crate) mod derivative_info;
pub(crate) mod description;
pub(crate) mod detectors;
pub(crate) mod peak_finder;
pub mod signal_window;

pub use costim_common::Real;
pub use derivative_info::compute_derivative_info;
pub use description::{DerivativeInfo, PeakDescription};
pub use detectors::{
    PeakDetectionStrategy, absolute_threshold_detector::AbsoluteThresholdDetector,
    baseline_relative_detector::BaselineRelativeDetector,
};

#[cfg(test)]
pub(crate) mod synthetic;
