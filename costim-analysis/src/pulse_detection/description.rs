use super::Real;
use costim_common::SampleIndex;

/// Measurements of a single peak, all in samples relative to the start of
/// the window it was found in.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct PeakDescription {
    pub peak: SampleIndex,
    /// Peak value less the window baseline.
    pub amplitude: Real,
    /// Full width at half prominence, truncated to whole samples.
    pub fwhm: usize,
    /// Last sample before the peak at which the signal was still below threshold.
    pub onset: SampleIndex,
    /// Interpolated left crossing on the rise, rounded up.
    pub t_on: SampleIndex,
    /// Interpolated right crossing on the decay, rounded up.
    pub t_off: SampleIndex,
    /// Samples between the first sub-0 V samples either side of the peak.
    /// `None` if the window runs out first.
    pub zero_crossing_width: Option<usize>,
    /// Whether the rise of the peak is steep enough to be a spike. Only set
    /// by detectors working against an absolute threshold.
    pub superthreshold: Option<bool>,
}

/// Higher resolution description of the rise of a single transient.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct DerivativeInfo {
    /// Where the rise begins, at 95% of the prominence below the peak.
    pub peak_start: SampleIndex,
    pub peak: SampleIndex,
    /// Offset from `peak_start` of the first sample whose dV/dt exceeds the threshold.
    pub threshold_crossing: Option<usize>,
    /// Offset from `peak_start` and value of the first peak of dV/dt.
    pub dvdt_peak: Option<(usize, Real)>,
    /// Mean rate of rise (mV/ms) between the threshold crossing and the peak.
    pub average_dvdt: Option<Real>,
    /// The dV/dt of the rise, when requested.
    pub dvdt: Option<Vec<Real>>,
}
