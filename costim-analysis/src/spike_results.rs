//! Spiking probability of costimulation runs grouped by stimulus strength and offset.
use crate::{file_data::FileData, pulse_detection::Real, run::CostimulationRun};
use costim_common::CellId;
use std::collections::{BTreeMap, BTreeSet};

/// Costim spike rate, as a whole percentage, at or above which a group is
/// considered suprathreshold.
const THRESHOLD_PERCENTAGE: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpikeKey {
    pub optical_bucket: i64,
    pub electrical_bucket: i64,
    /// ms
    pub offset: i32,
}

#[derive(Default, Debug, Clone, PartialEq)]
pub struct SpikeResults {
    pub runs: usize,
    pub costim_spikes: usize,
    pub opt_spikes: usize,
    pub elec_spikes: usize,
    pub cells: BTreeSet<CellId>,
}

impl SpikeResults {
    fn percentage(&self, spikes: usize) -> i64 {
        (100.0 * spikes as Real / self.runs as Real).round_ties_even() as i64
    }

    pub fn costim(&self) -> i64 {
        self.percentage(self.costim_spikes)
    }

    pub fn opt(&self) -> i64 {
        self.percentage(self.opt_spikes)
    }

    pub fn elec(&self) -> i64 {
        self.percentage(self.elec_spikes)
    }

    pub fn is_above_threshold(&self) -> bool {
        self.costim() >= THRESHOLD_PERCENTAGE
    }
}

/// Groups the runs of `files` which `select` accepts.
pub fn tally<'a, I, F>(files: I, select: F) -> BTreeMap<SpikeKey, SpikeResults>
where
    I: IntoIterator<Item = &'a FileData>,
    F: Fn(&CostimulationRun) -> bool,
{
    let mut spikes = BTreeMap::<SpikeKey, SpikeResults>::new();
    for file in files {
        for run in file.runs.iter().filter(|run| select(run)) {
            let results = spikes
                .entry(SpikeKey {
                    optical_bucket: file.optical_bucket,
                    electrical_bucket: file.electrical_bucket,
                    offset: run.metadata.offset,
                })
                .or_default();
            results.cells.insert(run.metadata.cell);
            results.runs += 1;
            results.costim_spikes += usize::from(run.windows.costim.action_potential);
            results.opt_spikes += usize::from(run.windows.optical.action_potential);
            results.elec_spikes += usize::from(run.windows.electrical.action_potential);
        }
    }
    spikes
}
