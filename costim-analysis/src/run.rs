//! A single costimulation run: one trace holding the combined, the
//! electrical-only and the optical-only responses.
use crate::{
    error::AnalysisResult,
    protocol::{PerStimulus, StimulationProtocol, StimulusType},
    pulse_detection::{
        PeakDetectionStrategy, Real, compute_derivative_info,
        signal_window::{derivative, max, mean},
    },
    time_constants::TimeConstantSet,
};
use costim_common::{
    CellId, MILLIS_PER_SECOND, ProtocolId,
    metrics::{names, stimulus::get_label},
};
use metrics::counter;
use std::ops::Range;
use tracing::{debug, instrument};

/// Fixed settings applied to every run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisSettings {
    /// Liquid junction potential, V, added to every sample.
    pub junction_potential: Real,
    /// Number of leading samples averaged to give the resting potential.
    pub resting_window: usize,
    /// Steepest rise, V/s (equivalently mV/ms), at or above which a window
    /// holds an action potential.
    pub ap_threshold: Real,
    /// dV/dt, V/s, marking the start of the rise in the derivative description.
    pub dvdt_threshold: Real,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            junction_potential: -0.0128,
            resting_window: 1000,
            ap_threshold: 100.0,
            dvdt_threshold: 25.0,
        }
    }
}

/// Experiment metadata copied onto each run.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct RunMetadata {
    /// Shift of the electrical pulse of the combined stimulus, ms.
    pub offset: i32,
    /// Percentage of the cell's electrical threshold.
    pub electrical_threshold: i64,
    /// Percentage of the cell's optical threshold.
    pub optical_threshold: i64,
    pub cell: CellId,
}

/// The outcome for one stimulus condition of a run.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct StimulusWindow {
    /// Samples of the run's trace holding the response.
    pub range: Range<usize>,
    /// Highest value in the window, mV.
    pub max_mv: Real,
    pub action_potential: bool,
    pub time_constants: TimeConstantSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostimulationRun {
    pub protocol_id: ProtocolId,
    pub metadata: RunMetadata,
    /// Seconds per sample.
    pub sample_period: Real,
    /// Junction potential corrected trace, V.
    pub data: Vec<Real>,
    /// Resting potential, mV.
    pub v_rest: Real,
    pub windows: PerStimulus<StimulusWindow>,
}

/// Whether the steepest rise of `data` reaches `threshold`.
pub fn is_action_potential(data: &[Real], sample_period: Real, threshold: Real) -> bool {
    max(&derivative(data, sample_period)).is_some_and(|steepest| steepest >= threshold)
}

impl CostimulationRun {
    /// Slices `data` into the window of each stimulus and describes the
    /// response in each one. Fails only if the protocol's windows do not fit
    /// the trace.
    #[instrument(skip_all, fields(
        protocol_id = protocol.protocol_id,
        offset = metadata.offset,
        costim_aps = tracing::field::Empty,
        elec_aps = tracing::field::Empty,
        opt_aps = tracing::field::Empty,
    ))]
    pub fn new<D: PeakDetectionStrategy>(
        protocol: &StimulationProtocol,
        data: &[Real],
        metadata: RunMetadata,
        detector: &D,
        settings: &AnalysisSettings,
    ) -> AnalysisResult<Self> {
        let data: Vec<Real> = data
            .iter()
            .map(|value| value + settings.junction_potential)
            .collect();
        let sample_period = protocol.sample_period();
        let samples_to_ms = sample_period * MILLIS_PER_SECOND;
        let v_rest = mean(data.get(..settings.resting_window).unwrap_or(&data))
            .unwrap_or_default()
            * MILLIS_PER_SECOND;

        let windows = PerStimulus::try_from_fn(|stimulus| -> AnalysisResult<_> {
            let range = protocol.slice_for(stimulus, data.len())?;
            let window = data.get(range.clone()).unwrap_or_default();

            let action_potential =
                is_action_potential(window, sample_period, settings.ap_threshold);
            if action_potential {
                counter!(names::ACTION_POTENTIALS, &[get_label(stimulus.into())])
                    .increment(1);
            }

            let peaks = detector.describe_peaks(window, None)?;
            let offset = match stimulus {
                StimulusType::Costim => metadata.offset,
                StimulusType::Electrical | StimulusType::Optical => 0,
            };
            let derivative = compute_derivative_info(
                window,
                sample_period,
                settings.dvdt_threshold,
                samples_to_ms,
                false,
            );
            if derivative.is_none() {
                debug!("No derivative description for the {stimulus} window");
            }

            Ok(StimulusWindow {
                max_mv: max(window).unwrap_or_default() * MILLIS_PER_SECOND,
                action_potential,
                time_constants: TimeConstantSet::from_peak(
                    peaks.first(),
                    sample_period,
                    protocol.onset_index_for(stimulus, offset),
                    derivative,
                ),
                range,
            })
        })?;

        let span = tracing::Span::current();
        span.record("costim_aps", windows.costim.action_potential);
        span.record("elec_aps", windows.electrical.action_potential);
        span.record("opt_aps", windows.optical.action_potential);
        counter!(names::RUNS_ANALYSED).increment(1);

        Ok(Self {
            protocol_id: protocol.protocol_id,
            metadata,
            sample_period,
            data,
            v_rest,
            windows,
        })
    }

    pub fn window(&self, stimulus: StimulusType) -> &StimulusWindow {
        self.windows.get(stimulus)
    }

    /// Samples of the trace in the window of `stimulus`, V.
    pub fn window_data(&self, stimulus: StimulusType) -> &[Real] {
        self.data
            .get(self.window(stimulus).range.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{AnalysisError, ConfigurationError},
        parameters::BaselineRelativeParameters,
        protocol::protocol,
        pulse_detection::{BaselineRelativeDetector, synthetic},
        time_constants::UNDEFINED_LATENCY,
    };
    use assert_approx_eq::assert_approx_eq;
    use strum::IntoEnumIterator;

    const RESTING: Real = -0.0572;
    const TRACE_LEN: usize = 85000;

    fn detector() -> BaselineRelativeDetector {
        BaselineRelativeDetector::new(&BaselineRelativeParameters::default())
    }

    fn metadata() -> RunMetadata {
        RunMetadata {
            offset: 3,
            electrical_threshold: 90,
            optical_threshold: 58,
            cell: 7,
        }
    }

    #[test]
    fn quiet_trace_has_no_responses() {
        let mut data = vec![RESTING; TRACE_LEN];
        synthetic::add_noise(&mut data, 0.0001, 42);

        let run = CostimulationRun::new(
            protocol(0).unwrap(),
            &data,
            metadata(),
            &detector(),
            &AnalysisSettings::default(),
        )
        .unwrap();

        assert_eq!(run.metadata, metadata());
        assert_approx_eq!(run.v_rest, -70.0, 0.2);
        for stimulus in StimulusType::iter() {
            let window = run.window(stimulus);
            assert!(!window.action_potential);
            assert_eq!(window.time_constants, TimeConstantSet::default());
            assert_approx_eq!(window.max_mv, -70.0, 0.2);
        }
        assert_eq!(run.window(StimulusType::Costim).range, 20000..40000);
        assert_eq!(run.window_data(StimulusType::Electrical).len(), 20000);
    }

    #[test]
    fn action_potential_in_one_window() {
        let mut data = vec![RESTING; TRACE_LEN];
        // 0.1 V over 10 samples is 500 V/s, rising from 5 ms after the electrical onset
        synthetic::add_triangle(&mut data, 50250, 10, 400, 0.1);

        let run = CostimulationRun::new(
            protocol(0).unwrap(),
            &data,
            metadata(),
            &detector(),
            &AnalysisSettings::default(),
        )
        .unwrap();

        let electrical = run.window(StimulusType::Electrical);
        assert!(electrical.action_potential);
        assert!(!run.window(StimulusType::Costim).action_potential);
        assert!(!run.window(StimulusType::Optical).action_potential);
        assert_approx_eq!(electrical.max_mv, 30.0, 1e-6);

        let time_constants = &electrical.time_constants;
        assert_eq!(time_constants.onset_latency, UNDEFINED_LATENCY);
        // peak 10 samples after the rise starts, 5260 samples into the window
        assert_approx_eq!(time_constants.peak_latency, 5.2, 1e-9);
        assert!(time_constants.fwhm_duration > 0.0);
    }

    #[test]
    fn steepest_rise_at_the_threshold_is_an_action_potential() {
        assert!(is_action_potential(&[0.0, 0.0, 50.0, 50.0], 0.5, 100.0));
        assert!(!is_action_potential(&[0.0, 0.0, 49.0, 50.0], 0.5, 100.0));
        assert!(!is_action_potential(&[], 0.5, 100.0));
    }

    #[test]
    fn short_trace_fails_the_run() {
        let data = vec![RESTING; 60000];
        let error = CostimulationRun::new(
            protocol(0).unwrap(),
            &data,
            metadata(),
            &detector(),
            &AnalysisSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(
            error,
            AnalysisError::Configuration(ConfigurationError::SliceOutOfBounds {
                stimulus: StimulusType::Electrical,
                ..
            })
        ));
    }

    #[test]
    fn costim_onset_follows_the_offset() {
        let mut data = vec![RESTING; TRACE_LEN];
        synthetic::add_triangle(&mut data, 25250, 10, 400, 0.1);
        let protocol = protocol(0).unwrap();
        let settings = AnalysisSettings::default();

        let early = CostimulationRun::new(protocol, &data, metadata(), &detector(), &settings)
            .unwrap();
        let late = CostimulationRun::new(
            protocol,
            &data,
            RunMetadata {
                offset: 5,
                ..metadata()
            },
            &detector(),
            &settings,
        )
        .unwrap();

        let latency = |run: &CostimulationRun| {
            run.window(StimulusType::Costim)
                .time_constants
                .peak_latency
        };
        assert_approx_eq!(latency(&early) - latency(&late), 2.0, 1e-9);
    }
}
