pub mod absolute_threshold_detector;
pub mod baseline_relative_detector;

use super::{PeakDescription, Real};
use crate::error::PeakCountMismatch;

/// A heuristic for locating the peaks of a window and describing each one.
///
/// The heuristics differ in how the detection threshold is set and how the
/// onset is searched for, and are tied to the protocol version they were
/// calibrated against, so one is always selected explicitly.
pub trait PeakDetectionStrategy {
    /// Describes every peak found in `trace`, in order of position.
    fn describe(&self, trace: &[Real]) -> Vec<PeakDescription>;

    /// As [`Self::describe`], but if `expected` is given the number of peaks
    /// found must equal it.
    fn describe_peaks(
        &self,
        trace: &[Real],
        expected: Option<usize>,
    ) -> Result<Vec<PeakDescription>, PeakCountMismatch> {
        let peaks = self.describe(trace);
        match expected {
            Some(expected) if expected != peaks.len() => Err(PeakCountMismatch {
                expected,
                found: peaks.len(),
            }),
            _ => Ok(peaks),
        }
    }
}

/// Rounds an interpolated crossing up to the next whole sample.
pub(crate) fn ceil_index(position: Real) -> usize {
    position.ceil() as usize
}
