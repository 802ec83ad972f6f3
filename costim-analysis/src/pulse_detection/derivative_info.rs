use super::{
    DerivativeInfo, Real,
    peak_finder::{PeakCriteria, find_peaks, peak_widths},
    signal_window,
};
use tracing::trace;

/// Windows whose maximum is below this never contain a transient worth describing.
const SANITY_FLOOR: Real = -0.02;
const PEAK_SEPARATION: usize = 1000;
const PEAK_MIN_WIDTH: Real = 50.0;
const PEAK_MIN_HEIGHT: Real = 1e-6;
/// The rise starts where the signal is 95% of its prominence below the peak.
const RISE_START_REL_HEIGHT: Real = 0.95;
const DVDT_PEAK_MIN_HEIGHT: Real = 25.0;
const DVDT_PEAK_MIN_WIDTH: Real = 6.0;

/// Describes the rise of the single transient in `data`.
///
/// Returns `None` when the description is inconclusive: the window never gets
/// near 0 V, there is not exactly one transient, or the rise starts at the
/// first sample.
///
/// # Arguments
/// * `data` - Window of the trace, in volts.
/// * `sample_period` - Seconds per sample.
/// * `dvdt_threshold` - dV/dt (V/s) which marks the start of the rise.
/// * `samples_to_ms` - Milliseconds per sample.
/// * `include_dvdt` - If set, the dV/dt of the rise is kept in the result.
pub fn compute_derivative_info(
    data: &[Real],
    sample_period: Real,
    dvdt_threshold: Real,
    samples_to_ms: Real,
    include_dvdt: bool,
) -> Option<DerivativeInfo> {
    if signal_window::max(data)? < SANITY_FLOOR {
        return None;
    }

    let found = find_peaks(
        data,
        &PeakCriteria {
            height: Some(PEAK_MIN_HEIGHT),
            distance: Some(PEAK_SEPARATION),
            width: Some(PEAK_MIN_WIDTH),
            ..Default::default()
        },
    );
    if found.len() != 1 {
        trace!("Derivative description inconclusive: {} peaks", found.len());
        return None;
    }
    let peak = *found.peaks.first()?;

    let widths = peak_widths(data, &found.peaks, RISE_START_REL_HEIGHT);
    let peak_start = *widths.left_ips.first()? as usize;
    if peak_start == 0 {
        return None;
    }

    // dV/dt at each sample of the rise, against the sample before it
    let dvdt: Vec<Real> = data
        .get(peak_start - 1..peak)?
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) / sample_period)
        .collect();

    let dvdt_peaks = find_peaks(
        &dvdt,
        &PeakCriteria {
            height: Some(DVDT_PEAK_MIN_HEIGHT),
            width: Some(DVDT_PEAK_MIN_WIDTH),
            ..Default::default()
        },
    );
    let dvdt_peak = dvdt_peaks
        .peaks
        .first()
        .and_then(|&index| Some((index, *dvdt.get(index)?)));

    let threshold_crossing = dvdt.iter().position(|&value| value > dvdt_threshold);
    let average_dvdt = threshold_crossing.and_then(|crossing| {
        let start = peak_start + crossing;
        let rise = data.get(peak)? - data.get(start)?;
        Some(1000.0 * rise / (samples_to_ms * (peak - start) as Real))
    });

    Some(DerivativeInfo {
        peak_start,
        peak,
        threshold_crossing,
        dvdt_peak,
        average_dvdt,
        dvdt: include_dvdt.then_some(dvdt),
    })
}
