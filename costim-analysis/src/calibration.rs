//! Conversion of raw stimulus powers into percentages of a cell's
//! threshold, and quantisation of those percentages into buckets.
use crate::error::CalibrationError;
use costim_common::Real;

const OPTICAL_OFFSET: Real = -3.552;
const OPTICAL_GAIN: Real = 0.00206664;

/// Converts an optical power in DACs with the LED calibration curve.
pub fn convert_optical_power(raw: Real) -> Real {
    OPTICAL_OFFSET + OPTICAL_GAIN * raw
}

fn floor_percentage(
    quantity: &'static str,
    numerator: Real,
    denominator: Real,
) -> Result<i64, CalibrationError> {
    let percentage = (100.0 * (numerator / denominator)).floor();
    if percentage.is_finite() {
        Ok(percentage as i64)
    } else {
        Err(CalibrationError::NonFinite {
            quantity,
            numerator,
            denominator,
        })
    }
}

/// Optical power as a whole percentage of the cell's optical threshold,
/// both given in DACs. Zero power is always zero percent.
pub fn optical_percentage(raw: Real, threshold: Real) -> Result<i64, CalibrationError> {
    if raw == 0.0 {
        return Ok(0);
    }
    floor_percentage(
        "optical",
        convert_optical_power(raw),
        convert_optical_power(threshold),
    )
}

/// Electrical current as a whole percentage of the cell's electrical threshold.
pub fn electrical_percentage(current: Real, threshold: Real) -> Result<i64, CalibrationError> {
    floor_percentage("electrical", current, threshold)
}

/// Rounds down to a multiple of `base`. Used for the per-file threshold buckets.
pub fn bucket_floor(value: i64, base: i64) -> i64 {
    value
        .checked_div_euclid(base)
        .map_or(value, |quotient| quotient * base)
}

/// Rounds to the nearest multiple of `base`, ties to even. Used when
/// grouping pulse-train runs.
pub fn bucket_nearest(value: Real, base: i64) -> i64 {
    let base = base as Real;
    (base * (value / base).round_ties_even()) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn optical_conversion() {
        assert_approx_eq!(convert_optical_power(0.0), -3.552);
        assert_approx_eq!(convert_optical_power(2200.0), 0.994608);
    }

    #[test]
    fn optical_percentages() {
        assert_eq!(optical_percentage(2200.0, 2200.0).unwrap(), 100);
        assert_eq!(optical_percentage(2000.0, 2200.0).unwrap(), 58);
        assert_eq!(optical_percentage(1800.0, 1900.0).unwrap(), 44);
        assert_eq!(optical_percentage(1650.0, 1750.0).unwrap(), -220);
    }

    #[test]
    fn zero_optical_power_is_zero_percent() {
        for threshold in [1750.0, 1900.0, 2200.0, 0.0] {
            assert_eq!(optical_percentage(0.0, threshold).unwrap(), 0);
        }
    }

    #[test]
    fn electrical_percentages() {
        assert_eq!(electrical_percentage(135.0, 150.0).unwrap(), 90);
        assert_eq!(electrical_percentage(200.0, 210.0).unwrap(), 95);
        assert_eq!(electrical_percentage(230.0, 210.0).unwrap(), 109);
        // the ratio is taken first, and 100 * 0.29 falls just short of 29
        assert_eq!(electrical_percentage(29.0, 100.0).unwrap(), 28);
    }

    #[test]
    fn non_finite_percentage_is_an_error() {
        assert!(matches!(
            electrical_percentage(135.0, 0.0),
            Err(CalibrationError::NonFinite {
                quantity: "electrical",
                ..
            })
        ));
        assert!(optical_percentage(2000.0, Real::NAN).is_err());
    }

    #[test]
    fn floor_buckets() {
        assert_eq!(bucket_floor(47, 5), 45);
        assert_eq!(bucket_floor(53, 5), 50);
        assert_eq!(bucket_floor(-3, 5), -5);
        assert_eq!(bucket_floor(50, 5), 50);
        assert_eq!(bucket_floor(17, 0), 17);
    }

    #[test]
    fn nearest_buckets() {
        assert_eq!(bucket_nearest(47.0, 5), 45);
        assert_eq!(bucket_nearest(53.0, 5), 55);
        assert_eq!(bucket_nearest(12.5, 5), 10);
        assert_eq!(bucket_nearest(17.5, 5), 20);
        assert_eq!(bucket_nearest(64.0, 10), 60);
        assert_eq!(bucket_nearest(65.0, 10), 60);
    }
}
