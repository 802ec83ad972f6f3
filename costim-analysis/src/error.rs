use crate::protocol::StimulusType;
use costim_common::{
    ProtocolId, Real,
    metrics::failures::{self, FailureKind},
};
use std::path::PathBuf;
use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error(
        "Slice for {stimulus} is out of bounds: {start}..{end} in a trace of {len} samples"
    )]
    SliceOutOfBounds {
        stimulus: StimulusType,
        start: i64,
        end: i64,
        len: usize,
    },
    #[error("Slice for {stimulus} is empty: {start}..{end}")]
    EmptySlice {
        stimulus: StimulusType,
        start: i64,
        end: i64,
    },
    #[error("Protocol {protocol_id} is invalid: {reason}")]
    InvalidProtocol {
        protocol_id: ProtocolId,
        reason: &'static str,
    },
    #[error("Unknown protocol {0}")]
    UnknownProtocol(ProtocolId),
    #[error("At least one electrical current level is required")]
    NoCurrentLevels,
}

#[derive(Debug, Error)]
#[error("Expected {expected} peaks but found {found}")]
pub struct PeakCountMismatch {
    pub expected: usize,
    pub found: usize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Unable to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed header in {path:?}: {reason}")]
    Header { path: PathBuf, reason: String },
    #[error("Truncated column {column} in {path:?}: expected {expected} bytes, got {found}")]
    Truncated {
        path: PathBuf,
        column: usize,
        expected: usize,
        found: usize,
    },
    #[error("Trace {path:?} has no time base column")]
    MissingTimeBase { path: PathBuf },
    #[error("Unable to parse manifest {path:?}: {source}")]
    Manifest {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("{quantity} percentage is not finite: {numerator} / {denominator}")]
    NonFinite {
        quantity: &'static str,
        numerator: Real,
        denominator: Real,
    },
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),
    #[error("{0}")]
    PeakCount(#[from] PeakCountMismatch),
    #[error("{0}")]
    Load(#[from] LoadError),
    #[error("{0}")]
    Calibration(#[from] CalibrationError),
    #[error("IO Error: {0}")]
    IO(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Configuration(_) => FailureKind::ConfigurationInvalid,
            Self::PeakCount(_) => FailureKind::PeakCountMismatch,
            Self::Load(_) => FailureKind::LoadFailed,
            Self::Calibration(_) => FailureKind::CalibrationInvalid,
            Self::IO(_) => FailureKind::ExportFailed,
        }
    }

    pub fn record_failure(&self) {
        metrics::counter!(
            costim_common::metrics::names::FAILURES,
            &[failures::get_label(self.failure_kind())]
        )
        .increment(1);
    }
}
