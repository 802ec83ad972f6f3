use super::{PeakDetectionStrategy, ceil_index};
use crate::{
    parameters::AbsoluteThresholdParameters,
    pulse_detection::{
        PeakDescription, Real,
        peak_finder::{PeakCriteria, find_peaks, peak_widths},
        signal_window::{derivative, find_bracket_width, find_last_index_backward, max, mean},
    },
};

const RISE_REL_HEIGHT: Real = 0.33;
const DECAY_REL_HEIGHT: Real = 0.67;

/// Detects peaks rising above a fixed voltage, flagging those whose rise is
/// steep enough to be a spike. Used for pulse trains, where many responses
/// share one window.
#[derive(Default, Debug, Clone)]
pub struct AbsoluteThresholdDetector {
    parameters: AbsoluteThresholdParameters,
    sample_period: Real,
}

impl AbsoluteThresholdDetector {
    pub fn new(parameters: &AbsoluteThresholdParameters, sample_period: Real) -> Self {
        Self {
            parameters: *parameters,
            sample_period,
        }
    }

    fn is_superthreshold(&self, rise: &[Real]) -> bool {
        max(&derivative(rise, self.sample_period))
            .is_some_and(|steepest| steepest >= self.parameters.superthreshold_dvdt)
    }
}

impl PeakDetectionStrategy for AbsoluteThresholdDetector {
    fn describe(&self, trace: &[Real]) -> Vec<PeakDescription> {
        let threshold = self.parameters.threshold;
        let baseline = mean(trace.get(..self.parameters.baseline_length).unwrap_or(trace))
            .unwrap_or_default();

        let found = find_peaks(
            trace,
            &PeakCriteria {
                height: Some(threshold),
                distance: Some(self.parameters.min_separation),
                width: Some(self.parameters.min_width),
                ..Default::default()
            },
        );

        let rises = peak_widths(trace, &found.peaks, RISE_REL_HEIGHT);
        let decays = peak_widths(trace, &found.peaks, DECAY_REL_HEIGHT);
        let zero_crossing_window = trace.get(..trace.len().saturating_sub(1)).unwrap_or_default();

        found
            .peaks
            .iter()
            .zip(found.widths.left_ips.iter().zip(&found.widths.right_ips))
            .zip(rises.left_ips.iter().zip(&decays.right_ips))
            .map(|((&peak, (&left, &right)), (&rise, &decay))| {
                let (left, right) = (left as usize, right as usize);
                let above_half_height = trace.get(left..right).unwrap_or_default();
                PeakDescription {
                    peak,
                    amplitude: trace.get(peak).copied().unwrap_or_default() - baseline,
                    fwhm: right - left,
                    onset: find_last_index_backward(trace, |&value| value < threshold, peak),
                    t_on: ceil_index(rise),
                    t_off: ceil_index(decay),
                    zero_crossing_width: find_bracket_width(zero_crossing_window, peak, 0.0),
                    superthreshold: Some(self.is_superthreshold(above_half_height)),
                }
            })
            .collect()
    }
}
