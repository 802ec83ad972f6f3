//! Analysis of intracellular recordings from costimulation experiments.
//!
//! Each recording holds a number of runs. A costimulation run is sliced into
//! the windows following combined, electrical-only and optical-only
//! stimulation, and each window is searched for an action potential whose
//! time constants are then measured. Pulse-train recordings are instead
//! searched for every spike in a train.
pub mod batch;
pub mod calibration;
pub mod error;
pub mod file_data;
pub mod loader;
pub mod manifest;
pub mod parameters;
pub mod protocol;
pub mod pulse_detection;
pub mod pulse_train;
pub mod run;
pub mod selectors;
pub mod spike_results;
pub mod summary;
pub mod time_constants;

pub use error::{AnalysisError, AnalysisResult};
