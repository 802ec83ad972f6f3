//! Analysis of every run in one costimulation recording.
use crate::{
    calibration::{bucket_floor, convert_optical_power, electrical_percentage, optical_percentage},
    error::AnalysisResult,
    loader::{TraceData, TraceSource},
    manifest::CostimFileMetadata,
    protocol::protocol,
    pulse_detection::{PeakDetectionStrategy, Real},
    run::{AnalysisSettings, CostimulationRun, RunMetadata},
};
use costim_common::{CellId, ProtocolId, metrics::names};
use metrics::counter;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Width of the threshold percentage buckets.
const BUCKET_BASE: i64 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct FileData {
    pub path: PathBuf,
    pub protocol_id: ProtocolId,
    /// Sample times, s.
    pub times: Vec<Real>,
    /// Calibrated optical power.
    pub optical_power: Real,
    /// Injected current, pA.
    pub electrical_power: Real,
    /// Optical power as a percentage of the cell's threshold.
    pub optical_threshold: i64,
    pub optical_bucket: i64,
    /// Electrical current as a percentage of the cell's threshold.
    pub electrical_threshold: i64,
    pub electrical_bucket: i64,
    pub cell: CellId,
    pub aps_observed: bool,
    pub runs: Vec<CostimulationRun>,
}

impl FileData {
    /// Loads the recording named by `metadata`, relative to `base_path`, and
    /// analyses each of its runs.
    pub fn analyse<S, D>(
        source: &S,
        base_path: &Path,
        metadata: &CostimFileMetadata,
        detector: &D,
        settings: &AnalysisSettings,
    ) -> AnalysisResult<Self>
    where
        S: TraceSource,
        D: PeakDetectionStrategy + Sync,
    {
        let path = base_path.join(&metadata.path);
        let trace = source.load(&path)?;
        Self::from_trace(trace, path, metadata, detector, settings)
    }

    #[instrument(skip_all, fields(path = %path.display(), cell = metadata.cell, runs = tracing::field::Empty))]
    pub fn from_trace<D>(
        trace: TraceData,
        path: PathBuf,
        metadata: &CostimFileMetadata,
        detector: &D,
        settings: &AnalysisSettings,
    ) -> AnalysisResult<Self>
    where
        D: PeakDetectionStrategy + Sync,
    {
        let protocol = protocol(metadata.protocol)?;
        protocol.validate()?;
        if protocol.has_incomplete_run(trace.columns.len()) {
            warn!(
                "{} has {} data columns, so its last run is missing some of its {} columns",
                path.display(),
                trace.columns.len(),
                protocol.column_count
            );
        }

        let run_columns = protocol.run_columns(&trace.columns);
        let offsets = protocol.pulse_offset_schedule(run_columns.len());
        tracing::Span::current().record("runs", run_columns.len());
        info!("Processing {} which has {} runs", path.display(), run_columns.len());

        let optical_threshold =
            optical_percentage(metadata.optical_power, metadata.optical_threshold)?;
        let electrical_threshold =
            electrical_percentage(metadata.electrical_power, metadata.electrical_threshold)?;

        let runs = run_columns
            .par_iter()
            .zip(offsets.par_iter())
            .map(|(data, &offset)| {
                CostimulationRun::new(
                    protocol,
                    data,
                    RunMetadata {
                        offset,
                        electrical_threshold,
                        optical_threshold,
                        cell: metadata.cell,
                    },
                    detector,
                    settings,
                )
            })
            .collect::<AnalysisResult<Vec<_>>>()?;

        counter!(names::FILES_ANALYSED).increment(1);

        Ok(Self {
            path,
            protocol_id: protocol.protocol_id,
            times: trace.times,
            optical_power: convert_optical_power(metadata.optical_power),
            electrical_power: metadata.electrical_power,
            optical_threshold,
            optical_bucket: bucket_floor(optical_threshold, BUCKET_BASE),
            electrical_threshold,
            electrical_bucket: bucket_floor(electrical_threshold, BUCKET_BASE),
            cell: metadata.cell,
            aps_observed: metadata.aps_observed,
            runs,
        })
    }

    /// Number of runs.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Whether any run had an action potential under combined stimulation.
    pub fn any_aps(&self) -> bool {
        self.runs
            .iter()
            .any(|run| run.windows.costim.action_potential)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        error::{AnalysisError, LoadError},
        parameters::BaselineRelativeParameters,
        pulse_detection::BaselineRelativeDetector, pulse_detection::synthetic,
    };
    use std::collections::HashMap;

    /// Serves recordings held in memory.
    #[derive(Default)]
    pub(crate) struct InMemorySource(pub(crate) HashMap<PathBuf, TraceData>);

    impl TraceSource for InMemorySource {
        fn load(&self, path: &Path) -> Result<TraceData, LoadError> {
            self.0.get(path).cloned().ok_or_else(|| LoadError::Io {
                path: path.to_owned(),
                source: std::io::ErrorKind::NotFound.into(),
            })
        }
    }

    const RESTING: Real = -0.0572;
    const TRACE_LEN: usize = 85000;

    /// A recording of protocol 1, which has two columns per run, with an
    /// action potential under combined stimulation in the second run.
    pub(crate) fn recording(runs: usize) -> TraceData {
        let mut columns = Vec::new();
        let mut names = Vec::new();
        for run in 0..runs {
            let mut vm = vec![RESTING; TRACE_LEN];
            if run == 1 {
                synthetic::add_triangle(&mut vm, 25250, 10, 400, 0.1);
            }
            columns.push(vm);
            columns.push(vec![0.0; TRACE_LEN]);
            names.push("Vm".to_owned());
            names.push("Command".to_owned());
        }
        TraceData {
            description: "costim".to_owned(),
            times: (0..TRACE_LEN).map(|i| i as Real * 2e-5).collect(),
            columns,
            names,
        }
    }

    pub(crate) fn metadata() -> CostimFileMetadata {
        CostimFileMetadata {
            path: PathBuf::from("cell3/costim.axgd"),
            capacitance: 20.0,
            optical_power: 2000.0,
            optical_threshold: 2200.0,
            electrical_power: 135.0,
            electrical_threshold: 150.0,
            aps_observed: true,
            cell: 3,
            protocol: 1,
        }
    }

    fn detector() -> BaselineRelativeDetector {
        BaselineRelativeDetector::new(&BaselineRelativeParameters::default())
    }

    fn source(trace: TraceData) -> InMemorySource {
        InMemorySource(HashMap::from([(
            PathBuf::from("data/cell3/costim.axgd"),
            trace,
        )]))
    }

    #[test]
    fn every_run_is_analysed() {
        let file = FileData::analyse(
            &source(recording(3)),
            Path::new("data"),
            &metadata(),
            &detector(),
            &AnalysisSettings::default(),
        )
        .unwrap();

        assert_eq!(file.len(), 3);
        assert_eq!(file.optical_threshold, 58);
        assert_eq!(file.optical_bucket, 55);
        assert_eq!(file.electrical_threshold, 90);
        assert_eq!(file.electrical_bucket, 90);
        assert!(file.any_aps());

        let offsets: Vec<_> = file.runs.iter().map(|run| run.metadata.offset).collect();
        assert_eq!(offsets, vec![-5, -3, -1]);
        let aps: Vec<_> = file
            .runs
            .iter()
            .map(|run| run.windows.costim.action_potential)
            .collect();
        assert_eq!(aps, vec![false, true, false]);
        for run in &file.runs {
            assert_eq!(run.metadata.cell, 3);
            assert_eq!(run.metadata.optical_threshold, 58);
        }
    }

    #[test]
    fn zero_optical_power_is_zero_percent() {
        let metadata = CostimFileMetadata {
            optical_power: 0.0,
            ..metadata()
        };
        let file = FileData::analyse(
            &source(recording(1)),
            Path::new("data"),
            &metadata,
            &detector(),
            &AnalysisSettings::default(),
        )
        .unwrap();
        assert_eq!(file.optical_threshold, 0);
        assert_eq!(file.optical_bucket, 0);
        assert!(!file.any_aps());
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let error = FileData::analyse(
            &InMemorySource::default(),
            Path::new("data"),
            &metadata(),
            &detector(),
            &AnalysisSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(error, AnalysisError::Load(LoadError::Io { .. })));
    }

    #[test]
    fn incomplete_last_run_is_still_analysed() {
        let mut trace = recording(3);
        trace.columns.pop();
        trace.names.pop();
        assert_eq!(trace.columns.len(), 5);
        let file = FileData::from_trace(
            trace,
            PathBuf::from("partial.axgd"),
            &metadata(),
            &detector(),
            &AnalysisSettings::default(),
        )
        .unwrap();
        assert_eq!(file.len(), 3);
        let offsets: Vec<_> = file.runs.iter().map(|run| run.metadata.offset).collect();
        assert_eq!(offsets, vec![-5, -3, -1]);
        assert!(file.runs[1].windows.costim.action_potential);
    }

    #[test]
    fn unknown_protocol_is_a_configuration_error() {
        let metadata = CostimFileMetadata {
            protocol: 12,
            ..metadata()
        };
        let error = FileData::from_trace(
            recording(1),
            PathBuf::from("unknown.axgd"),
            &metadata,
            &detector(),
            &AnalysisSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(error, AnalysisError::Configuration(_)));
    }
}
