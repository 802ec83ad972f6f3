//! Synthetic traces for tests.
use super::Real;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Adds a triangular transient which rises linearly from `start` for `rise`
/// samples to `amplitude`, then falls linearly back over `fall` samples.
pub(crate) fn add_triangle(
    data: &mut [Real],
    start: usize,
    rise: usize,
    fall: usize,
    amplitude: Real,
) {
    for i in 0..=rise {
        if let Some(value) = data.get_mut(start + i) {
            *value += amplitude * i as Real / rise as Real;
        }
    }
    for i in 1..=fall {
        if let Some(value) = data.get_mut(start + rise + i) {
            *value += amplitude * (fall - i) as Real / fall as Real;
        }
    }
}

/// Adds an exponential approach to `amplitude` with time constant `tau_rise`
/// for `rise` samples, followed by an exponential decay with time constant
/// `tau_fall` to the end of the trace.
pub(crate) fn add_exponential(
    data: &mut [Real],
    start: usize,
    rise: usize,
    tau_rise: Real,
    tau_fall: Real,
    amplitude: Real,
) {
    let peak = amplitude * (1.0 - (-(rise as Real) / tau_rise).exp());
    for (i, value) in data.iter_mut().enumerate().skip(start) {
        let t = (i - start) as Real;
        *value += if i - start <= rise {
            amplitude * (1.0 - (-t / tau_rise).exp())
        } else {
            peak * (-(t - rise as Real) / tau_fall).exp()
        };
    }
}

/// Adds uniform noise in `[-scale, scale)` from a fixed seed.
pub(crate) fn add_noise(data: &mut [Real], scale: Real, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for value in data.iter_mut() {
        *value += rng.random_range(-scale..scale);
    }
}
