use anyhow::{Context, Result};
use clap::Parser;
use costim_analysis::{
    batch::analyse_batch,
    error::AnalysisError,
    file_data::FileData,
    loader::ColumnFileSource,
    manifest::{CostimFileMetadata, Manifest, PulseTrainFileMetadata},
    parameters::{Cli, Mode},
    pulse_detection::BaselineRelativeDetector,
    pulse_train::{PulseTrainFile, PulseTrainRow},
    run::AnalysisSettings,
    selectors::HoldingRange,
    spike_results,
    summary::{SaveToFileFilter, write_costim_summary},
};
use costim_common::{
    init_tracer,
    metrics::{component_info_metric, describe_metrics},
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{fs::File, io::BufWriter, io::Write};
use tracing::{debug, info};

fn main() -> Result<()> {
    let args = Cli::parse();

    let _tracer = init_tracer!(args.log_level);

    if let Some(address) = args.observability_address {
        PrometheusBuilder::new()
            .with_http_listener(address)
            .install()
            .context("Prometheus metrics exporter should be set up")?;
    }
    describe_metrics();
    component_info_metric("costim-analysis");

    let source = ColumnFileSource;

    match &args.mode {
        Mode::Costim(parameters) => {
            let manifest = Manifest::<CostimFileMetadata>::load(&args.manifest)?;
            let detector = BaselineRelativeDetector::new(&parameters.detector);
            let settings = AnalysisSettings {
                dvdt_threshold: parameters.dvdt_threshold,
                ..Default::default()
            };

            let files = analyse_batch(&manifest.files, args.fail_fast, |metadata| {
                FileData::analyse(&source, &args.base_path, metadata, &detector, &settings)
            })?;

            let hold = HoldingRange::new(parameters.min_hold, parameters.max_hold);
            let spikes = spike_results::tally(&files, |run| parameters.selector.selects(run, &hold));
            info!("{} spike groups from the {:?} selection", spikes.len(), parameters.selector);
            for (key, results) in spikes {
                debug!(
                    "{key:?}: {} runs, costim {}%, optical {}%, electrical {}%",
                    results.runs,
                    results.costim(),
                    results.opt(),
                    results.elec()
                );
            }

            let mut output = BufWriter::new(File::create(&args.output)?);
            write_costim_summary(&files, &mut output)
                .and_then(|()| output.flush())
                .map_err(|e| {
                    let e = AnalysisError::from(e);
                    e.record_failure();
                    e
                })?;
        }
        Mode::PulseTrain(parameters) => {
            let manifest = Manifest::<PulseTrainFileMetadata>::load(&args.manifest)?;
            let settings = AnalysisSettings::default();

            let files = analyse_batch(&manifest.files, args.fail_fast, |metadata| {
                PulseTrainFile::analyse(&source, &args.base_path, metadata, parameters, &settings)
            })?;

            files
                .iter()
                .flat_map(PulseTrainRow::rows)
                .save_to_file(&args.output)
                .map_err(|e| {
                    let e = AnalysisError::from(e);
                    e.record_failure();
                    e
                })?;
        }
    }
    info!("Summary written to {}", args.output.display());
    Ok(())
}
