use crate::pulse_detection::{DerivativeInfo, PeakDescription, Real};
use costim_common::MILLIS_PER_SECOND;

/// Reported for onset latency whenever a peak is found, since it is unclear
/// which stimulus the latency should be measured from when they overlap.
pub const UNDEFINED_LATENCY: Real = -1.0;

/// Duration in samples reported when a 0 V crossing could not be bracketed.
const UNBRACKETED_DURATION: Real = -1.0;

/// Time-domain description of the response to one stimulus, in milliseconds.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct TimeConstantSet {
    pub onset_latency: Real,
    /// From stimulus onset to the peak.
    pub peak_latency: Real,
    pub fwhm_duration: Real,
    /// Time spent above 0 V.
    pub mv0_duration: Real,
    /// From stimulus onset to one time constant into the rise.
    pub on_tau: Real,
    /// From the peak to one time constant into the decay.
    pub off_tau: Real,
    pub derivative: Option<DerivativeInfo>,
}

impl TimeConstantSet {
    /// Converts a peak's sample indices into milliseconds. If there is no
    /// peak every field is zero and the derivative information is dropped.
    ///
    /// # Arguments
    /// * `peak` - The peak to describe, if one was found.
    /// * `sample_period` - Seconds per sample.
    /// * `stim_onset` - Index of the stimulus onset, in the same window as the peak.
    /// * `derivative` - Rise description of the same window.
    pub fn from_peak(
        peak: Option<&PeakDescription>,
        sample_period: Real,
        stim_onset: Real,
        derivative: Option<DerivativeInfo>,
    ) -> Self {
        let Some(peak) = peak else {
            return Self::default();
        };
        let to_ms = |samples: Real| samples * sample_period * MILLIS_PER_SECOND;

        Self {
            onset_latency: UNDEFINED_LATENCY,
            peak_latency: to_ms(peak.peak as Real - stim_onset),
            fwhm_duration: to_ms(peak.fwhm as Real),
            mv0_duration: to_ms(
                peak.zero_crossing_width
                    .map_or(UNBRACKETED_DURATION, |width| width as Real),
            ),
            on_tau: to_ms(peak.t_on as Real - stim_onset),
            off_tau: to_ms(peak.t_off as Real - peak.peak as Real),
            derivative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const PERIOD: Real = 2e-5;

    #[test]
    fn no_peak_gives_zeros() {
        let set = TimeConstantSet::from_peak(
            None,
            PERIOD,
            5000.0,
            Some(DerivativeInfo::default()),
        );
        assert_eq!(set, TimeConstantSet::default());
        assert_eq!(set.derivative, None);
    }

    #[test]
    fn peak_is_converted_to_milliseconds() {
        let peak = PeakDescription {
            peak: 5500,
            amplitude: 0.1,
            fwhm: 150,
            onset: 5200,
            t_on: 5300,
            t_off: 5650,
            zero_crossing_width: Some(100),
            superthreshold: None,
        };
        let set = TimeConstantSet::from_peak(Some(&peak), PERIOD, 5000.0, None);

        assert_eq!(set.onset_latency, UNDEFINED_LATENCY);
        assert_approx_eq!(set.peak_latency, 10.0);
        assert_approx_eq!(set.fwhm_duration, 3.0);
        assert_approx_eq!(set.mv0_duration, 2.0);
        assert_approx_eq!(set.on_tau, 6.0);
        assert_approx_eq!(set.off_tau, 3.0);
    }

    #[test]
    fn fractional_onset_and_missing_crossing() {
        let peak = PeakDescription {
            peak: 5000,
            t_on: 4900,
            t_off: 5100,
            zero_crossing_width: None,
            ..Default::default()
        };
        // 3.5 ms before the window's nominal onset
        let set = TimeConstantSet::from_peak(Some(&peak), PERIOD, 5175.0, None);

        assert_approx_eq!(set.peak_latency, -3.5);
        assert_approx_eq!(set.on_tau, -5.5);
        assert_approx_eq!(set.mv0_duration, -0.02);
    }
}
