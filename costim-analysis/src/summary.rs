//! CSV summaries, one row per run.
use crate::{
    file_data::FileData,
    protocol::StimulusType,
    pulse_detection::Real,
    run::CostimulationRun,
};
use std::{
    borrow::Cow,
    fs::File,
    io::{BufWriter, Error, Write},
    path::Path,
};

pub trait SavablePoint {
    /// Column names, comma separated.
    const HEADER: &'static str;

    fn write_to_file<W: Write>(&self, file: &mut W) -> Result<(), Error>;
}

pub trait SaveToFileFilter<I>
where
    I: Iterator,
    I::Item: SavablePoint,
{
    fn save_to_writer<W: Write>(self, writer: &mut W) -> Result<(), Error>;
    fn save_to_file(self, path: &Path) -> Result<(), Error>;
}

impl<I> SaveToFileFilter<I> for I
where
    I: Iterator,
    I::Item: SavablePoint,
{
    fn save_to_writer<W: Write>(self, writer: &mut W) -> Result<(), Error> {
        writeln!(writer, "{}", <I::Item as SavablePoint>::HEADER)?;
        for item in self {
            item.write_to_file(writer)?;
        }
        Ok(())
    }

    fn save_to_file(self, path: &Path) -> Result<(), Error> {
        let mut file = BufWriter::new(File::create(path)?);
        self.save_to_writer(&mut file)?;
        file.flush()
    }
}

/// One run of a costimulation file.
#[derive(Debug, Clone, Copy)]
pub struct CostimRow<'a> {
    pub file: &'a FileData,
    pub run: &'a CostimulationRun,
}

impl<'a> CostimRow<'a> {
    pub fn rows(file: &'a FileData) -> impl Iterator<Item = CostimRow<'a>> {
        file.runs.iter().map(move |run| CostimRow { file, run })
    }
}

fn flag(value: bool) -> u8 {
    u8::from(value)
}

impl CostimRow<'_> {
    fn write_time_constants<W: Write>(
        &self,
        file: &mut W,
        stimulus: StimulusType,
    ) -> Result<(), Error> {
        let time_constants = &self.run.window(stimulus).time_constants;
        write!(
            file,
            ",{},{},{},{},{},{}",
            time_constants.onset_latency,
            time_constants.peak_latency,
            time_constants.mv0_duration,
            time_constants.fwhm_duration,
            time_constants.on_tau,
            time_constants.off_tau
        )
    }
}

impl SavablePoint for CostimRow<'_> {
    const HEADER: &'static str = "cell,run,optical_threshold,opt_bucket,electrical_threshold,elec_bucket,offset,\
costim_aps,costim_max_mv,\
costim_onset_latency_ms,costim_peak_latency_ms,costim_0mV_duration_ms,costim_fwhm_duration_ms,costim_t_on_ms,costim_t_off_ms,\
elec_onset_latency_ms,elec_peak_latency_ms,elec_0mV_duration_ms,elec_fwhm_duration_ms,elec_t_on_ms,elec_t_off_ms,\
opt_onset_latency_ms,opt_peak_latency_ms,opt_0mV_duration_ms,opt_fwhm_duration_ms,opt_t_on_ms,opt_t_off_ms,\
elec_aps,elec_max_mv,optical_aps,opt_max_mv,v_rest";

    fn write_to_file<W: Write>(&self, file: &mut W) -> Result<(), Error> {
        let windows = &self.run.windows;
        write!(
            file,
            "{},{},{},{},{},{},{},{},{}",
            self.file.cell,
            quoted_path(&self.file.path),
            self.file.optical_threshold,
            self.file.optical_bucket,
            self.file.electrical_threshold,
            self.file.electrical_bucket,
            self.run.metadata.offset,
            flag(windows.costim.action_potential),
            windows.costim.max_mv,
        )?;
        self.write_time_constants(file, StimulusType::Costim)?;
        self.write_time_constants(file, StimulusType::Electrical)?;
        self.write_time_constants(file, StimulusType::Optical)?;
        writeln!(
            file,
            ",{},{},{},{},{}",
            flag(windows.electrical.action_potential),
            windows.electrical.max_mv,
            flag(windows.optical.action_potential),
            windows.optical.max_mv,
            self.run.v_rest
        )
    }
}

/// Writes one row per run of every file.
pub fn write_costim_summary<W: Write>(files: &[FileData], writer: &mut W) -> Result<(), Error> {
    files
        .iter()
        .flat_map(CostimRow::rows)
        .save_to_writer(writer)
}

/// A path as a CSV field, quoted if it holds a separator, a quote or a line break.
pub(crate) fn quoted_path(path: &Path) -> Cow<'_, str> {
    let path = path.to_string_lossy();
    if path.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", path.replace('"', "\"\"")))
    } else {
        path
    }
}

/// Formats a ratio for output, writing `NaN` for undefined values.
pub(crate) fn format_ratio(value: Real) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        "NaN".to_owned()
    }
}
