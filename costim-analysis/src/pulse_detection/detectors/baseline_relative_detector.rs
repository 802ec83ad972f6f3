use super::{PeakDetectionStrategy, ceil_index};
use crate::{
    parameters::BaselineRelativeParameters,
    pulse_detection::{
        PeakDescription, Real,
        peak_finder::{PeakCriteria, find_peaks, peak_widths},
        signal_window::{differences, find_bracket_width, find_last_index_backward, mean},
    },
};
use tracing::trace;

/// One time constant down from the peak on the rise, i.e. `1 - 1/e`.
const RISE_REL_HEIGHT: Real = 0.368;
/// One time constant down from the peak on the decay.
const DECAY_REL_HEIGHT: Real = 0.632;

/// Detects peaks rising above a threshold set a fixed fraction below the
/// baseline of the window, which suits windows holding a single stimulus
/// response in volts.
#[derive(Default, Debug, Clone)]
pub struct BaselineRelativeDetector {
    parameters: BaselineRelativeParameters,
}

impl BaselineRelativeDetector {
    pub fn new(parameters: &BaselineRelativeParameters) -> Self {
        Self {
            parameters: *parameters,
        }
    }

    fn baseline(&self, trace: &[Real]) -> Option<Real> {
        mean(trace.get(..self.parameters.baseline_length).unwrap_or(trace))
    }
}

impl PeakDetectionStrategy for BaselineRelativeDetector {
    fn describe(&self, trace: &[Real]) -> Vec<PeakDescription> {
        let Some(baseline) = self.baseline(trace) else {
            return Vec::new();
        };
        let threshold = baseline - self.parameters.threshold_fraction * baseline;

        let found = find_peaks(
            trace,
            &PeakCriteria {
                height: Some(threshold),
                distance: Some(self.parameters.min_separation),
                width: Some(self.parameters.min_width),
                ..Default::default()
            },
        );
        trace!("Found {} peaks above {threshold}", found.len());

        let rises = peak_widths(trace, &found.peaks, RISE_REL_HEIGHT);
        let decays = peak_widths(trace, &found.peaks, DECAY_REL_HEIGHT);

        // Each sample paired with the step to the next one
        let steps: Vec<(Real, Real)> = trace
            .iter()
            .copied()
            .zip(differences(trace))
            .collect();
        let onset_derivative_threshold = self.parameters.onset_derivative_threshold;
        let is_onset = |&(value, step): &(Real, Real)| {
            value < threshold && step > onset_derivative_threshold
        };

        let zero_crossing_window = trace.get(..steps.len()).unwrap_or_default();

        found
            .peaks
            .iter()
            .zip(found.widths.left_ips.iter().zip(&found.widths.right_ips))
            .zip(rises.left_ips.iter().zip(&decays.right_ips))
            .map(|((&peak, (&left, &right)), (&rise, &decay))| PeakDescription {
                peak,
                amplitude: trace.get(peak).copied().unwrap_or_default() - baseline,
                fwhm: (right - left) as usize,
                onset: find_last_index_backward(&steps, &is_onset, peak),
                t_on: ceil_index(rise),
                t_off: ceil_index(decay),
                zero_crossing_width: find_bracket_width(zero_crossing_window, peak, 0.0),
                superthreshold: None,
            })
            .collect()
    }
}
