//! Floating-point closeness tests shared by the engines

/// True when `value` cannot be told apart from zero at the given epsilon.
///
/// With `epsilon = f64::EPSILON` this is the "adding it to 1.0 changes
/// nothing" test, stated explicitly instead of relying on rounding.
pub fn is_negligible(value: f64, epsilon: f64) -> bool {
    value.abs() < epsilon
}

/// Absolute-or-relative comparison: `|a - b| <= tol * max(1, |a|, |b|)`.
pub fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    let scale = 1.0_f64.max(a.abs()).max(b.abs());
    (a - b).abs() <= tol * scale
}
