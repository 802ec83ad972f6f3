use crate::{pulse_detection::Real, selectors::RunSelector};
use clap::{Args, Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf};
use tracing::level_filters::LevelFilter;

#[derive(Debug, Parser)]
#[clap(author, version, about)]
pub struct Cli {
    /// JSON manifest listing the recording files and their experiment metadata.
    #[clap(long)]
    pub manifest: PathBuf,

    /// Directory the manifest's file paths are relative to.
    #[clap(long, default_value = ".")]
    pub base_path: PathBuf,

    /// Path of the CSV summary to write.
    #[clap(long)]
    pub output: PathBuf,

    /// If set, counters are exported to Prometheus on this address.
    #[clap(long, env)]
    pub observability_address: Option<SocketAddr>,

    /// Abort the batch on the first file that fails to analyse.
    #[clap(long)]
    pub fail_fast: bool,

    #[clap(long, default_value = "info")]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    #[clap(
        about = "Analyses costimulation runs: combined, electrical-only and optical-only windows per run."
    )]
    Costim(CostimParameters),
    #[clap(about = "Analyses optical pulse trains, counting superthreshold peaks per run.")]
    PulseTrain(AbsoluteThresholdParameters),
}

#[derive(Debug, Clone, Args)]
pub struct CostimParameters {
    #[clap(flatten)]
    pub detector: BaselineRelativeParameters,

    /// dV/dt (V/s) which marks the start of the rise in the derivative description.
    #[clap(long, default_value = "25")]
    pub dvdt_threshold: Real,

    /// Runs counted in the spike tallies.
    #[clap(long, value_enum, default_value_t = RunSelector::All)]
    pub selector: RunSelector,

    /// Lowest accepted resting potential, mV.
    #[clap(long, allow_hyphen_values = true)]
    pub min_hold: Option<Real>,

    /// Highest accepted resting potential, mV.
    #[clap(long, allow_hyphen_values = true)]
    pub max_hold: Option<Real>,
}

impl Default for CostimParameters {
    fn default() -> Self {
        Self {
            detector: BaselineRelativeParameters::default(),
            dvdt_threshold: 25.0,
            selector: RunSelector::All,
            min_hold: None,
            max_hold: None,
        }
    }
}

/// Settings of the detector which places its threshold a fraction below
/// the window's own baseline.
#[derive(Debug, Clone, Copy, PartialEq, Args)]
pub struct BaselineRelativeParameters {
    /// Number of leading samples averaged to give the baseline.
    #[clap(long, default_value = "250")]
    pub baseline_length: usize,

    /// Detection threshold is `baseline - threshold_fraction * baseline`.
    #[clap(long, default_value = "0.03")]
    pub threshold_fraction: Real,

    /// Minimum number of samples between two peaks.
    #[clap(long, default_value = "5000")]
    pub min_separation: usize,

    /// Minimum peak width in samples.
    #[clap(long, default_value = "50")]
    pub min_width: Real,

    /// Sample-to-sample rise which, together with a sub-threshold value, marks the onset.
    #[clap(long, default_value = "0.02")]
    pub onset_derivative_threshold: Real,
}

impl Default for BaselineRelativeParameters {
    fn default() -> Self {
        Self {
            baseline_length: 250,
            threshold_fraction: 0.03,
            min_separation: 5000,
            min_width: 50.0,
            onset_derivative_threshold: 0.02,
        }
    }
}

/// Settings of the detector which uses a fixed voltage threshold.
#[derive(Debug, Clone, Copy, PartialEq, Args)]
pub struct AbsoluteThresholdParameters {
    /// Minimum peak value, in the units of the trace.
    #[clap(long, default_value = "-20", allow_hyphen_values = true)]
    pub threshold: Real,

    /// Number of leading samples averaged to give the baseline.
    #[clap(long, default_value = "200")]
    pub baseline_length: usize,

    /// Minimum number of samples between two peaks.
    #[clap(long, default_value = "500")]
    pub min_separation: usize,

    /// Minimum peak width in samples.
    #[clap(long, default_value = "50")]
    pub min_width: Real,

    /// Derivative (trace units per second) a peak's rise must reach to count as superthreshold.
    #[clap(long, default_value = "100")]
    pub superthreshold_dvdt: Real,
}

impl Default for AbsoluteThresholdParameters {
    fn default() -> Self {
        Self {
            threshold: -20.0,
            baseline_length: 200,
            min_separation: 500,
            min_width: 50.0,
            superthreshold_dvdt: 100.0,
        }
    }
}
