//! Local-maximum peak finding with height, separation and width criteria,
//! plus the prominence and width measurements the criteria rely on.
use super::Real;
use costim_common::SampleIndex;

/// Criteria applied by [`find_peaks`], in the order they are listed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PeakCriteria {
    /// Minimum peak value.
    pub(crate) height: Option<Real>,
    /// Minimum number of samples between retained peaks; taller peaks win.
    pub(crate) distance: Option<usize>,
    /// Minimum width in samples, measured at `rel_height`.
    pub(crate) width: Option<Real>,
    /// Relative height (fraction of prominence below the peak) at which width is measured.
    pub(crate) rel_height: Real,
}

impl Default for PeakCriteria {
    fn default() -> Self {
        Self {
            height: None,
            distance: None,
            width: None,
            rel_height: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Prominences {
    pub(crate) prominences: Vec<Real>,
    pub(crate) left_bases: Vec<SampleIndex>,
    pub(crate) right_bases: Vec<SampleIndex>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Widths {
    pub(crate) widths: Vec<Real>,
    pub(crate) width_heights: Vec<Real>,
    /// Interpolated left crossing, in fractional samples.
    pub(crate) left_ips: Vec<Real>,
    /// Interpolated right crossing, in fractional samples.
    pub(crate) right_ips: Vec<Real>,
}

/// Peaks which survived every criterion, with the widths measured for them.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FoundPeaks {
    pub(crate) peaks: Vec<SampleIndex>,
    pub(crate) widths: Widths,
}

impl FoundPeaks {
    pub(crate) fn len(&self) -> usize {
        self.peaks.len()
    }
}

/// Finds every local maximum. A flat-topped maximum is reported at the middle
/// of its plateau (rounded down). The first and last samples are never peaks.
pub(crate) fn local_maxima(x: &[Real]) -> Vec<SampleIndex> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }
    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut i_ahead = i + 1;
            while i_ahead < i_max && x[i_ahead] == x[i] {
                i_ahead += 1;
            }
            if x[i_ahead] < x[i] {
                let left_edge = i;
                let right_edge = i_ahead - 1;
                peaks.push((left_edge + right_edge) / 2);
                i = i_ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Keeps the highest peaks such that no two retained peaks are closer than
/// `distance` samples.
fn select_by_distance(x: &[Real], peaks: &[SampleIndex], distance: usize) -> Vec<SampleIndex> {
    let mut keep = vec![true; peaks.len()];

    let mut priority: Vec<usize> = (0..peaks.len()).collect();
    priority.sort_by(|&a, &b| x[peaks[a]].total_cmp(&x[peaks[b]]));

    for &j in priority.iter().rev() {
        if !keep[j] {
            continue;
        }
        for k in (0..j).rev() {
            if peaks[j] - peaks[k] >= distance {
                break;
            }
            keep[k] = false;
        }
        for k in (j + 1)..peaks.len() {
            if peaks[k] - peaks[j] >= distance {
                break;
            }
            keep[k] = false;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&peak, keep)| keep.then_some(peak))
        .collect()
}

/// Prominence of each peak: its height above the higher of the two lowest
/// points reached before the signal climbs above the peak on either side.
pub(crate) fn peak_prominences(x: &[Real], peaks: &[SampleIndex]) -> Prominences {
    let mut result = Prominences::default();

    for &peak in peaks.iter().filter(|&&peak| peak < x.len()) {
        let peak_value = x[peak];

        let mut left_min = peak_value;
        let mut left_base = peak;
        for (i, &value) in x[..=peak].iter().enumerate().rev() {
            if value > peak_value {
                break;
            }
            if value < left_min {
                left_min = value;
                left_base = i;
            }
        }

        let mut right_min = peak_value;
        let mut right_base = peak;
        for (i, &value) in x.iter().enumerate().skip(peak) {
            if value > peak_value {
                break;
            }
            if value < right_min {
                right_min = value;
                right_base = i;
            }
        }

        result.prominences.push(peak_value - left_min.max(right_min));
        result.left_bases.push(left_base);
        result.right_bases.push(right_base);
    }
    result
}

fn widths_from_prominences(
    x: &[Real],
    peaks: &[SampleIndex],
    prominences: &Prominences,
    rel_height: Real,
) -> Widths {
    let mut result = Widths::default();

    for (i, &peak) in peaks.iter().filter(|&&peak| peak < x.len()).enumerate() {
        let height = x[peak] - prominences.prominences[i] * rel_height;

        let mut left = peak;
        while prominences.left_bases[i] < left && height < x[left] {
            left -= 1;
        }
        let mut left_ip = left as Real;
        if x[left] < height {
            left_ip += (height - x[left]) / (x[left + 1] - x[left]);
        }

        let mut right = peak;
        while right < prominences.right_bases[i] && height < x[right] {
            right += 1;
        }
        let mut right_ip = right as Real;
        if x[right] < height {
            right_ip -= (height - x[right]) / (x[right - 1] - x[right]);
        }

        result.widths.push(right_ip - left_ip);
        result.width_heights.push(height);
        result.left_ips.push(left_ip);
        result.right_ips.push(right_ip);
    }
    result
}

/// Width of each peak at `rel_height` of its prominence below the peak,
/// with linearly interpolated crossing points.
pub(crate) fn peak_widths(x: &[Real], peaks: &[SampleIndex], rel_height: Real) -> Widths {
    let prominences = peak_prominences(x, peaks);
    widths_from_prominences(x, peaks, &prominences, rel_height)
}

/// Local maxima filtered by height, then separation, then width.
pub(crate) fn find_peaks(x: &[Real], criteria: &PeakCriteria) -> FoundPeaks {
    let mut peaks = local_maxima(x);

    if let Some(height) = criteria.height {
        peaks.retain(|&peak| x[peak] >= height);
    }

    if let Some(distance) = criteria.distance {
        if distance > 1 && peaks.len() > 1 {
            peaks = select_by_distance(x, &peaks, distance);
        }
    }

    let prominences = peak_prominences(x, &peaks);
    let widths = widths_from_prominences(x, &peaks, &prominences, criteria.rel_height);

    match criteria.width {
        Some(min_width) => {
            let mut found = FoundPeaks::default();
            for (i, &peak) in peaks.iter().enumerate() {
                if widths.widths[i] >= min_width {
                    found.peaks.push(peak);
                    found.widths.widths.push(widths.widths[i]);
                    found.widths.width_heights.push(widths.width_heights[i]);
                    found.widths.left_ips.push(widths.left_ips[i]);
                    found.widths.right_ips.push(widths.right_ips[i]);
                }
            }
            found
        }
        None => FoundPeaks { peaks, widths },
    }
}
