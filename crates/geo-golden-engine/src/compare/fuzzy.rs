//! Tolerance-based floating point equality.

/// Fixed tolerance for raster statistics.
pub const STATISTICS_EPS: f64 = 1e-8;

/// Two values are equal if both are NaN, or they differ by less than `eps`.
///
/// Identical values (including equal infinities) are always equal.
pub fn fuzzy_equals(expected: f64, actual: f64, eps: f64) -> bool {
    if expected.is_nan() || actual.is_nan() {
        return expected.is_nan() && actual.is_nan();
    }
    expected == actual || (expected - actual).abs() < eps
}
