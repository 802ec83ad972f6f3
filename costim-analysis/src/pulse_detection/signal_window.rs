//! Pure helpers over a fixed-length window of samples.
//!
//! None of these functions fail: searches that run out of samples report a
//! sentinel (index `0`, or `None` for a width) which callers treat as a
//! degenerate but valid outcome.
use super::Real;
use costim_common::SampleIndex;

/// Scans `start_index, start_index - 1, ..., 1` and returns the first index
/// whose sample satisfies `predicate`.
///
/// Index `0` is never tested and doubles as the "not found" sentinel, which
/// clamps the search result to the start of the window. A `start_index`
/// beyond the end of `sequence` is clamped to the last sample.
pub fn find_last_index_backward<T, P>(
    sequence: &[T],
    predicate: P,
    start_index: SampleIndex,
) -> SampleIndex
where
    P: Fn(&T) -> bool,
{
    let start_index = start_index.min(sequence.len().saturating_sub(1));
    (1..=start_index)
        .rev()
        .find(|&idx| sequence.get(idx).is_some_and(&predicate))
        .unwrap_or(0)
}

/// Expands outward from `center_index`, looking left and right at the same
/// time for the first sample below `level`, and returns the distance between
/// the two crossings.
///
/// Returns `None` once the left edge of `sequence` is reached before both
/// crossings are found. A crossing found at distance zero (the centre itself
/// is below `level`) does not count as a crossing on either side.
pub fn find_bracket_width(
    sequence: &[Real],
    center_index: SampleIndex,
    level: Real,
) -> Option<usize> {
    if center_index >= sequence.len() {
        return None;
    }
    let mut start = center_index;
    let mut end = center_index;

    for delta in 0..center_index {
        let right = center_index + delta;
        if end == center_index && sequence.get(right).is_some_and(|&v| v < level) {
            end = right;
        }

        let left = center_index - delta;
        if start == center_index && sequence.get(left).is_some_and(|&v| v < level) {
            start = left;
        }

        if start != center_index && end != center_index {
            return Some(end - start);
        }
    }
    None
}

/// First-order forward difference divided by `sample_period`, with a leading
/// zero so that the output is aligned sample-for-sample with the input.
pub fn derivative(sequence: &[Real], sample_period: Real) -> Vec<Real> {
    if sequence.is_empty() {
        return Vec::new();
    }
    std::iter::once(0.0)
        .chain(
            sequence
                .windows(2)
                .map(|pair| (pair[1] - pair[0]) / sample_period),
        )
        .collect()
}

/// Sample-to-sample differences, one shorter than the input.
pub(crate) fn differences(sequence: &[Real]) -> Vec<Real> {
    sequence.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

pub(crate) fn mean(sequence: &[Real]) -> Option<Real> {
    (!sequence.is_empty()).then(|| sequence.iter().sum::<Real>() / sequence.len() as Real)
}

pub(crate) fn max(sequence: &[Real]) -> Option<Real> {
    sequence.iter().copied().reduce(Real::max)
}
