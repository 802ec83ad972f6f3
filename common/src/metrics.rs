use metrics::{Unit, describe_counter, describe_gauge, gauge};

pub fn component_info_metric(name: &'static str) {
    static NAME: &str = "costim_analysis_component_info";

    describe_gauge!(NAME, "Basic information about the component");

    let git_rev = option_env!("GIT_VERSION").unwrap_or("unknown");
    gauge!(NAME, "component" => name, "git_version" => git_rev).set(1);
}

/// Registers descriptions for every counter emitted by the analysis crates.
pub fn describe_metrics() {
    describe_counter!(names::FILES_ANALYSED, Unit::Count, "Recording files analysed");
    describe_counter!(names::RUNS_ANALYSED, Unit::Count, "Stimulation runs analysed");
    describe_counter!(
        names::ACTION_POTENTIALS,
        Unit::Count,
        "Action potentials detected by stimulus condition"
    );
    describe_counter!(names::FAILURES, Unit::Count, "Failures by kind");
}

pub mod names {
    use const_format::concatcp;

    pub const METRIC_NAME_PREFIX: &str = "costim_analysis_";

    pub const ACTION_POTENTIALS: &str = concatcp!(METRIC_NAME_PREFIX, "action_potentials");
    pub const FAILURES: &str = concatcp!(METRIC_NAME_PREFIX, "failures");
    pub const FILES_ANALYSED: &str = concatcp!(METRIC_NAME_PREFIX, "files_analysed");
    pub const RUNS_ANALYSED: &str = concatcp!(METRIC_NAME_PREFIX, "runs_analysed");
}

pub mod failures {
    #[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
    pub enum FailureKind {
        CalibrationInvalid,
        ConfigurationInvalid,
        ExportFailed,
        LoadFailed,
        PeakCountMismatch,
    }

    // Label building function
    pub fn get_label(failure_kind: FailureKind) -> (&'static str, &'static str) {
        (
            "failure_kind",
            match failure_kind {
                FailureKind::CalibrationInvalid => "calibration_invalid",
                FailureKind::ConfigurationInvalid => "configuration_invalid",
                FailureKind::ExportFailed => "export_failed",
                FailureKind::LoadFailed => "load_failed",
                FailureKind::PeakCountMismatch => "peak_count_mismatch",
            },
        )
    }
}

pub mod stimulus {
    // Label building function
    pub fn get_label(stimulus: &'static str) -> (&'static str, &'static str) {
        ("stimulus", stimulus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_are_prefixed() {
        for name in [
            names::ACTION_POTENTIALS,
            names::FAILURES,
            names::FILES_ANALYSED,
            names::RUNS_ANALYSED,
        ] {
            assert!(name.starts_with(names::METRIC_NAME_PREFIX));
        }
    }

    #[test]
    fn failure_labels() {
        assert_eq!(
            failures::get_label(failures::FailureKind::LoadFailed),
            ("failure_kind", "load_failed")
        );
        assert_eq!(
            failures::get_label(failures::FailureKind::PeakCountMismatch),
            ("failure_kind", "peak_count_mismatch")
        );
    }
}
