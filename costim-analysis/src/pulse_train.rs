//! Analysis of optical pulse trains delivered while the injected current is
//! stepped through a number of levels.
use crate::{
    calibration::{bucket_nearest, electrical_percentage, optical_percentage},
    error::{AnalysisResult, ConfigurationError, LoadError},
    loader::{TraceData, TraceSource},
    manifest::PulseTrainFileMetadata,
    parameters::AbsoluteThresholdParameters,
    pulse_detection::{AbsoluteThresholdDetector, PeakDetectionStrategy, Real, signal_window::mean},
    run::AnalysisSettings,
    summary::{SavablePoint, format_ratio, quoted_path},
};
use costim_common::{CellId, MILLIS_PER_SECOND, SampleIndex, metrics::names};
use metrics::counter;
use rayon::prelude::*;
use std::{
    f64::consts::TAU,
    io::{Error, Write},
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

/// Number of leading samples averaged to give the baseline of the adaption ratio.
const ADAPTION_BASELINE_LENGTH: usize = 500;
/// Pulses per train.
pub const DEFAULT_STIMULI: usize = 10;
const OPTICAL_BUCKET_BASE: i64 = 10;
const ELECTRICAL_BUCKET_BASE: i64 = 5;

/// Vector strength and phase, in radians, of `events` against a periodic
/// stimulus. Both are NaN if there are no events.
pub fn vector_strength(events: &[Real], period: Real) -> (Real, Real) {
    let count = events.len() as Real;
    let (sin, cos) = events
        .iter()
        .map(|time| (TAU * time / period).sin_cos())
        .fold((0.0, 0.0), |(sin, cos), (s, c)| (sin + s, cos + c));
    let (sin, cos) = (sin / count, cos / count);
    (sin.hypot(cos), sin.atan2(cos))
}

/// Currents of each level, in pA, from `min` rising in equal whole steps.
pub fn current_levels(min: i64, max: i64, levels: usize) -> Result<Vec<i64>, ConfigurationError> {
    if levels == 0 {
        return Err(ConfigurationError::NoCurrentLevels);
    }
    let step = (max - min)
        .checked_div_euclid(levels as i64 - 1)
        .unwrap_or_default();
    Ok((0..levels as i64).map(|i| min + i * step).collect())
}

#[derive(Debug, Clone, PartialEq)]
pub struct PulseTrainRun {
    /// Junction potential corrected trace, mV.
    pub data: Vec<Real>,
    /// pA
    pub electrical_current: i64,
    /// Current as a percentage of the cell's electrical threshold.
    pub electrical_percentage: i64,
    /// Positions of the superthreshold peaks.
    pub peaks: Vec<SampleIndex>,
}

impl PulseTrainRun {
    pub fn new<D: PeakDetectionStrategy>(
        data: &[Real],
        electrical_current: i64,
        electrical_percentage: i64,
        detector: &D,
        settings: &AnalysisSettings,
    ) -> Self {
        let junction_potential = settings.junction_potential * MILLIS_PER_SECOND;
        let data: Vec<Real> = data
            .iter()
            .map(|value| value * MILLIS_PER_SECOND + junction_potential)
            .collect();
        let peaks = detector
            .describe(&data)
            .into_iter()
            .filter(|peak| peak.superthreshold.unwrap_or_default())
            .map(|peak| peak.peak)
            .collect();
        counter!(names::RUNS_ANALYSED).increment(1);

        Self {
            data,
            electrical_current,
            electrical_percentage,
            peaks,
        }
    }

    /// Fraction of `num_stimuli` pulses which produced a spike.
    pub fn spike_ratio(&self, num_stimuli: usize) -> Real {
        self.peaks.len() as Real / num_stimuli as Real
    }

    /// Height of the last spike over the height of the first, both above
    /// the baseline, or zero if there are fewer than two spikes.
    pub fn adaption_ratio(&self) -> Real {
        let (Some(&first), Some(&last)) = (self.peaks.first(), self.peaks.last()) else {
            return 0.0;
        };
        if self.peaks.len() < 2 {
            return 0.0;
        }
        let baseline = mean(
            self.data
                .get(..ADAPTION_BASELINE_LENGTH)
                .unwrap_or(&self.data),
        )
        .unwrap_or_default();
        let height = |index: SampleIndex| self.data.get(index).copied().unwrap_or_default() - baseline;
        height(last) / height(first)
    }

    /// Vector strength and phase of the spikes against a stimulus of `period` seconds.
    pub fn vector_strength(&self, times: &[Real], period: Real) -> (Real, Real) {
        let events: Vec<Real> = self
            .peaks
            .iter()
            .filter_map(|&peak| times.get(peak).copied())
            .collect();
        vector_strength(&events, period)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PulseTrainFile {
    pub path: PathBuf,
    /// Optical power as a percentage of the cell's threshold.
    pub optical_percentage: i64,
    /// ms
    pub optical_pulse_width: Real,
    /// ms
    pub optical_isi: Real,
    /// pA
    pub electrical_threshold: Real,
    pub cell: CellId,
    /// Sample times, s.
    pub times: Vec<Real>,
    pub runs: Vec<PulseTrainRun>,
}

impl PulseTrainFile {
    pub fn analyse<S: TraceSource>(
        source: &S,
        base_path: &Path,
        metadata: &PulseTrainFileMetadata,
        parameters: &AbsoluteThresholdParameters,
        settings: &AnalysisSettings,
    ) -> AnalysisResult<Self> {
        let path = base_path.join(&metadata.path);
        let trace = source.load(&path)?;
        Self::from_trace(trace, path, metadata, parameters, settings)
    }

    #[instrument(skip_all, fields(path = %path.display(), cell = metadata.cell, runs = tracing::field::Empty))]
    pub fn from_trace(
        trace: TraceData,
        path: PathBuf,
        metadata: &PulseTrainFileMetadata,
        parameters: &AbsoluteThresholdParameters,
        settings: &AnalysisSettings,
    ) -> AnalysisResult<Self> {
        let sample_period = trace
            .sample_period()
            .ok_or_else(|| LoadError::MissingTimeBase { path: path.clone() })?;
        let column_count = trace.unique_column_names().max(1);
        if trace.columns.len() % column_count != 0 {
            warn!(
                "{} has {} data columns, so its last run is missing some of its {} columns",
                path.display(),
                trace.columns.len(),
                column_count
            );
        }
        let run_count = trace.columns.len().div_ceil(column_count);
        tracing::Span::current().record("runs", run_count);
        info!("Processing {} which has {} runs", path.display(), run_count);

        let levels = current_levels(
            metadata.min_current,
            metadata.max_current,
            metadata.current_levels,
        )?;
        let currents: Vec<i64> = levels.iter().copied().cycle().take(run_count).collect();
        let percentages = currents
            .iter()
            .map(|&current| electrical_percentage(current as Real, metadata.electrical_threshold))
            .collect::<Result<Vec<_>, _>>()?;
        let optical_percentage =
            optical_percentage(metadata.optical_power, metadata.optical_threshold)?;

        let detector = AbsoluteThresholdDetector::new(parameters, sample_period);
        let runs = trace
            .columns
            .par_iter()
            .step_by(column_count)
            .zip(currents.par_iter().zip(percentages.par_iter()))
            .map(|(data, (&current, &percentage))| {
                PulseTrainRun::new(data, current, percentage, &detector, settings)
            })
            .collect();

        counter!(names::FILES_ANALYSED).increment(1);

        Ok(Self {
            path,
            optical_percentage,
            optical_pulse_width: metadata.optical_pulse_width,
            optical_isi: metadata.optical_isi,
            electrical_threshold: metadata.electrical_threshold,
            cell: metadata.cell,
            times: trace.times,
            runs,
        })
    }

    /// Stimulus period, s.
    pub fn stimulus_period(&self) -> Real {
        (self.optical_isi + self.optical_pulse_width) / MILLIS_PER_SECOND
    }

    /// Pulse frequency in whole Hz.
    pub fn frequency(&self) -> i64 {
        (MILLIS_PER_SECOND / (self.optical_isi + self.optical_pulse_width)).floor() as i64
    }

    pub fn optical_bucket(&self) -> i64 {
        bucket_nearest(self.optical_percentage as Real, OPTICAL_BUCKET_BASE)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// One run of a pulse-train file.
#[derive(Debug, Clone, Copy)]
pub struct PulseTrainRow<'a> {
    pub file: &'a PulseTrainFile,
    pub run: &'a PulseTrainRun,
}

impl<'a> PulseTrainRow<'a> {
    pub fn rows(file: &'a PulseTrainFile) -> impl Iterator<Item = PulseTrainRow<'a>> {
        file.runs.iter().map(move |run| PulseTrainRow { file, run })
    }
}

impl SavablePoint for PulseTrainRow<'_> {
    const HEADER: &'static str = "run,optical_power,spikes,electrical_power,electrical_threshold,\
vector_strength,vector_strength_phase,adaption_ratio,spike_ratio,frequency,cell,opt_bucket,elec_bucket";

    fn write_to_file<W: Write>(&self, file: &mut W) -> Result<(), Error> {
        let (strength, phase) = self
            .run
            .vector_strength(&self.file.times, self.file.stimulus_period());
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{},{},{},{},{}",
            quoted_path(&self.file.path),
            self.file.optical_percentage,
            self.run.peaks.len(),
            self.run.electrical_current,
            self.file.electrical_threshold,
            format_ratio(strength),
            format_ratio(phase),
            format_ratio(self.run.adaption_ratio()),
            100.0 * self.run.spike_ratio(DEFAULT_STIMULI),
            self.file.frequency(),
            self.file.cell,
            self.file.optical_bucket(),
            bucket_nearest(
                self.run.electrical_percentage as Real,
                ELECTRICAL_BUCKET_BASE
            ),
        )
    }
}
