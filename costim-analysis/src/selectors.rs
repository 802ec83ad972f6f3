//! Predicates choosing which costimulation runs enter the spike tallies.
use crate::{pulse_detection::Real, run::CostimulationRun};
use clap::ValueEnum;

/// Optical stimulus strength, as a percentage of threshold, below which a
/// run is usable at all.
const VALID_OPTICAL_LIMIT: i64 = 130;
/// Optical stimulus strength below which the optical pulse alone is
/// expected to be subthreshold.
const SUBTHRESHOLD_OPTICAL_LIMIT: i64 = 100;
/// Largest electrical pulse offset, ms, for the subthreshold optical selection.
const MAX_SUBTHRESHOLD_OFFSET: i32 = 30;

/// Accepted resting potentials, mV, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldingRange {
    pub min: Real,
    pub max: Real,
}

impl HoldingRange {
    pub fn new(min: Option<Real>, max: Option<Real>) -> Self {
        Self {
            min: min.unwrap_or(Real::NEG_INFINITY),
            max: max.unwrap_or(Real::INFINITY),
        }
    }

    pub fn contains(&self, v_rest: Real) -> bool {
        (self.min..=self.max).contains(&v_rest)
    }
}

impl Default for HoldingRange {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl CostimulationRun {
    /// Whether the cell rested within `hold` before stimulation.
    pub fn correct_hold(&self, hold: &HoldingRange) -> bool {
        hold.contains(self.v_rest)
    }

    /// Whether neither stimulus alone produced an action potential.
    pub fn no_opt_or_elec_aps(&self) -> bool {
        !self.windows.optical.action_potential && !self.windows.electrical.action_potential
    }

    /// Whether any window of the run holds an action potential.
    pub fn any_aps(&self) -> bool {
        self.windows.costim.action_potential
            || self.windows.electrical.action_potential
            || self.windows.optical.action_potential
    }

    fn optical_threshold_below(&self, limit: i64) -> bool {
        (1..limit).contains(&self.metadata.optical_threshold)
    }
}

/// Which runs are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RunSelector {
    /// Every run.
    #[default]
    All,
    /// Runs at the holding potential with an optical strength between 0 and 130 %.
    ValidData,
    /// Valid runs in which neither stimulus alone fired, with an optical
    /// strength between 0 and 100 %.
    Costim,
    /// Runs at the holding potential with no optical action potential, an
    /// offset of at most 30 ms, and an optical response at or above rest.
    SubthresholdOptical,
}

impl RunSelector {
    pub fn selects(&self, run: &CostimulationRun, hold: &HoldingRange) -> bool {
        match self {
            Self::All => true,
            Self::ValidData => {
                run.correct_hold(hold) && run.optical_threshold_below(VALID_OPTICAL_LIMIT)
            }
            Self::Costim => {
                run.correct_hold(hold)
                    && run.no_opt_or_elec_aps()
                    && run.optical_threshold_below(SUBTHRESHOLD_OPTICAL_LIMIT)
            }
            Self::SubthresholdOptical => {
                run.correct_hold(hold)
                    && !run.windows.optical.action_potential
                    && run.metadata.offset <= MAX_SUBTHRESHOLD_OFFSET
                    && run.windows.optical.max_mv >= run.v_rest
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        protocol::PerStimulus,
        run::{RunMetadata, StimulusWindow},
    };

    fn window(action_potential: bool, max_mv: Real) -> StimulusWindow {
        StimulusWindow {
            action_potential,
            max_mv,
            ..Default::default()
        }
    }

    fn run(v_rest: Real, optical_threshold: i64, offset: i32) -> CostimulationRun {
        CostimulationRun {
            protocol_id: 0,
            metadata: RunMetadata {
                offset,
                electrical_threshold: 90,
                optical_threshold,
                cell: 1,
            },
            sample_period: 2e-5,
            data: Vec::new(),
            v_rest,
            windows: PerStimulus {
                costim: window(false, -60.0),
                electrical: window(false, -65.0),
                optical: window(false, -62.0),
            },
        }
    }

    fn hold() -> HoldingRange {
        HoldingRange::new(Some(-75.0), Some(-65.0))
    }

    #[test]
    fn holding_range_is_inclusive() {
        assert!(run(-75.0, 50, 0).correct_hold(&hold()));
        assert!(run(-65.0, 50, 0).correct_hold(&hold()));
        assert!(!run(-75.1, 50, 0).correct_hold(&hold()));
        assert!(!run(-64.9, 50, 0).correct_hold(&hold()));
        assert!(run(-90.0, 50, 0).correct_hold(&HoldingRange::default()));
    }

    #[test]
    fn any_aps_checks_every_window() {
        let mut quiet = run(-70.0, 50, 0);
        assert!(!quiet.any_aps());
        assert!(quiet.no_opt_or_elec_aps());

        quiet.windows.costim.action_potential = true;
        assert!(quiet.any_aps());
        assert!(quiet.no_opt_or_elec_aps());

        let mut electrical = run(-70.0, 50, 0);
        electrical.windows.electrical.action_potential = true;
        assert!(electrical.any_aps());
        assert!(!electrical.no_opt_or_elec_aps());
    }

    #[test]
    fn valid_data_bounds() {
        let selector = RunSelector::ValidData;
        assert!(!selector.selects(&run(-70.0, 0, 0), &hold()));
        assert!(selector.selects(&run(-70.0, 1, 0), &hold()));
        assert!(selector.selects(&run(-70.0, 129, 0), &hold()));
        assert!(!selector.selects(&run(-70.0, 130, 0), &hold()));
        assert!(!selector.selects(&run(-80.0, 50, 0), &hold()));
        assert!(RunSelector::All.selects(&run(-80.0, 500, 0), &hold()));
    }

    #[test]
    fn costim_bounds() {
        let selector = RunSelector::Costim;
        assert!(selector.selects(&run(-70.0, 99, 0), &hold()));
        assert!(!selector.selects(&run(-70.0, 100, 0), &hold()));
        assert!(!selector.selects(&run(-70.0, 0, 0), &hold()));

        let mut optical = run(-70.0, 50, 0);
        optical.windows.optical.action_potential = true;
        assert!(!selector.selects(&optical, &hold()));

        let mut costim = run(-70.0, 50, 0);
        costim.windows.costim.action_potential = true;
        assert!(selector.selects(&costim, &hold()));
    }

    #[test]
    fn subthreshold_optical_bounds() {
        let selector = RunSelector::SubthresholdOptical;
        assert!(selector.selects(&run(-70.0, 150, 30), &hold()));
        assert!(!selector.selects(&run(-70.0, 150, 31), &hold()));
        assert!(!selector.selects(&run(-60.0, 150, 0), &hold()));

        let mut hyperpolarised = run(-70.0, 50, 0);
        hyperpolarised.windows.optical.max_mv = -70.5;
        assert!(!selector.selects(&hyperpolarised, &hold()));
        hyperpolarised.windows.optical.max_mv = -70.0;
        assert!(selector.selects(&hyperpolarised, &hold()));

        let mut fired = run(-70.0, 50, 0);
        fired.windows.optical.action_potential = true;
        assert!(!selector.selects(&fired, &hold()));
    }
}
