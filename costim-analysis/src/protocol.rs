//! Timing layout of the costimulation experiments.
//!
//! Each run of a costimulation protocol holds three responses in one trace:
//! combined optical and electrical stimulation first, then electrical only,
//! then optical only. Consecutive runs shift the electrical pulse of the
//! combined stimulus by a round-robin schedule of offsets.
use crate::error::ConfigurationError;
use costim_common::{MILLIS_PER_SECOND, ProtocolId, Real, SampleRate};
use lazy_static::lazy_static;
use std::ops::Range;
use strum::{Display, EnumIter, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum StimulusType {
    Costim,
    Electrical,
    Optical,
}

/// One value for each of the three stimulus conditions.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct PerStimulus<T> {
    pub costim: T,
    pub electrical: T,
    pub optical: T,
}

impl<T> PerStimulus<T> {
    pub fn get(&self, stimulus: StimulusType) -> &T {
        match stimulus {
            StimulusType::Costim => &self.costim,
            StimulusType::Electrical => &self.electrical,
            StimulusType::Optical => &self.optical,
        }
    }

    pub fn try_from_fn<E, F>(mut f: F) -> Result<Self, E>
    where
        F: FnMut(StimulusType) -> Result<T, E>,
    {
        Ok(Self {
            costim: f(StimulusType::Costim)?,
            electrical: f(StimulusType::Electrical)?,
            optical: f(StimulusType::Optical)?,
        })
    }

}

/// Window and stimulus lengths common to every protocol, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtocolTiming {
    /// Length of the window kept before each stimulus onset.
    pub pre_stim: Real,
    /// Length of the window kept after each stimulus onset.
    pub post_stim: Real,
    pub optical_duration: Real,
    pub electrical_duration: Real,
}

impl Default for ProtocolTiming {
    fn default() -> Self {
        Self {
            pre_stim: 0.1,
            post_stim: 0.3,
            optical_duration: 0.010,
            electrical_duration: 0.003,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StimulationProtocol {
    pub protocol_id: ProtocolId,
    /// First offset of the schedule, in ms.
    pub first_offset: i32,
    pub num_offsets: usize,
    /// Step between consecutive offsets, in ms.
    pub delta_offset: i32,
    pub frequency: SampleRate,
    /// Number of interleaved columns recorded per run.
    pub column_count: usize,
    /// Seconds from the start of the trace to each stimulus.
    pub onsets: PerStimulus<Real>,
    pub timing: ProtocolTiming,
}

impl StimulationProtocol {
    pub fn new(
        protocol_id: ProtocolId,
        first_offset: i32,
        num_offsets: usize,
        delta_offset: i32,
    ) -> Self {
        Self {
            protocol_id,
            first_offset,
            num_offsets,
            delta_offset,
            frequency: 50_000,
            column_count: 3,
            onsets: PerStimulus {
                costim: 0.5,
                electrical: 1.0,
                optical: 1.4,
            },
            timing: ProtocolTiming::default(),
        }
    }

    pub fn with_column_count(self, column_count: usize) -> Self {
        Self {
            column_count,
            ..self
        }
    }

    pub fn with_optical_onset(self, optical: Real) -> Self {
        Self {
            onsets: PerStimulus {
                optical,
                ..self.onsets
            },
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |reason| ConfigurationError::InvalidProtocol {
            protocol_id: self.protocol_id,
            reason,
        };
        if self.frequency == 0 {
            return Err(invalid("sampling frequency is zero"));
        }
        if self.column_count == 0 {
            return Err(invalid("column count is zero"));
        }
        if self.num_offsets == 0 {
            return Err(invalid("offset schedule is empty"));
        }
        let timing = &self.timing;
        if timing.optical_duration > timing.post_stim || timing.electrical_duration > timing.post_stim
        {
            return Err(invalid("stimulus outlasts the post-stimulus window"));
        }
        Ok(())
    }

    /// Seconds per sample.
    pub fn sample_period(&self) -> Real {
        1.0 / Real::from(self.frequency)
    }

    fn seconds_to_index(&self, seconds: Real) -> i64 {
        (seconds * Real::from(self.frequency)) as i64
    }

    /// Range of samples holding the response to `stimulus`, checked against
    /// the length of the trace.
    pub fn slice_for(
        &self,
        stimulus: StimulusType,
        trace_len: usize,
    ) -> Result<Range<usize>, ConfigurationError> {
        let onset = self.onsets.get(stimulus);
        let start = self.seconds_to_index(onset - self.timing.pre_stim);
        let end = self.seconds_to_index(onset + self.timing.post_stim);

        if start >= end {
            return Err(ConfigurationError::EmptySlice {
                stimulus,
                start,
                end,
            });
        }
        match (usize::try_from(start), usize::try_from(end)) {
            (Ok(start), Ok(end)) if end <= trace_len => Ok(start..end),
            _ => Err(ConfigurationError::SliceOutOfBounds {
                stimulus,
                start,
                end,
                len: trace_len,
            }),
        }
    }

    /// Index of the onset of `stimulus`, shifted by `offset_ms`, relative to
    /// the start of the stimulus's own window.
    pub fn onset_index_for(&self, stimulus: StimulusType, offset_ms: i32) -> Real {
        let onset = self.onsets.get(stimulus);
        let start = self.seconds_to_index(onset - self.timing.pre_stim);
        (onset + Real::from(offset_ms) / MILLIS_PER_SECOND) * Real::from(self.frequency)
            - start as Real
    }

    /// The offset schedule repeated round-robin to cover `run_count` runs.
    pub fn pulse_offset_schedule(&self, run_count: usize) -> Vec<i32> {
        (0..self.num_offsets as i32)
            .map(|i| self.first_offset + i * self.delta_offset)
            .cycle()
            .take(run_count)
            .collect()
    }

    /// Number of runs in a recording with `data_columns` columns besides the
    /// time base. A trailing incomplete group still starts with a trace, so
    /// it counts as a run.
    pub fn run_count(&self, data_columns: usize) -> usize {
        data_columns.div_ceil(self.column_count.max(1))
    }

    /// Whether the last run of a recording with `data_columns` columns is
    /// missing some of its columns.
    pub fn has_incomplete_run(&self, data_columns: usize) -> bool {
        data_columns % self.column_count.max(1) != 0
    }

    /// The first column of each run.
    pub fn run_columns<'a>(&self, columns: &'a [Vec<Real>]) -> Vec<&'a [Real]> {
        columns
            .iter()
            .step_by(self.column_count.max(1))
            .map(Vec::as_slice)
            .collect()
    }
}

lazy_static! {
    static ref PROTOCOLS: Vec<StimulationProtocol> = vec![
        StimulationProtocol::new(0, -5, 18, 1),
        StimulationProtocol::new(1, -5, 18, 2).with_column_count(2),
        StimulationProtocol::new(2, -5, 18, 3).with_column_count(2),
        StimulationProtocol::new(3, -5, 18, 2)
            .with_column_count(2)
            .with_optical_onset(1.5),
        StimulationProtocol::new(4, -5, 18, 2)
            .with_column_count(1)
            .with_optical_onset(1.5),
        StimulationProtocol::new(5, 10, 9, 4)
            .with_column_count(2)
            .with_optical_onset(1.5),
        StimulationProtocol::new(6, -3, 9, 4)
            .with_column_count(2)
            .with_optical_onset(1.5),
    ];
}

/// Looks up a protocol of the catalog by id.
pub fn protocol(protocol_id: ProtocolId) -> Result<&'static StimulationProtocol, ConfigurationError> {
    PROTOCOLS
        .get(protocol_id)
        .ok_or(ConfigurationError::UnknownProtocol(protocol_id))
}
