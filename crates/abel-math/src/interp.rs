//! Bilinear sampling of images at fractional pixel coordinates.

use ndarray::ArrayView2;

/// Bilinear interpolation of `field` at fractional `(row, col)`.
///
/// Coordinates outside `[0, rows-1] × [0, cols-1]` sample zero.
/// A degenerate axis of length 1 is sampled exactly at index 0.
pub fn bilinear_sample(field: &ArrayView2<f64>, row: f64, col: f64) -> f64 {
    let (nrows, ncols) = field.dim();
    if nrows == 0 || ncols == 0 || !row.is_finite() || !col.is_finite() {
        return 0.0;
    }
    let max_row = (nrows - 1) as f64;
    let max_col = (ncols - 1) as f64;
    if row < 0.0 || col < 0.0 || row > max_row || col > max_col {
        return 0.0;
    }

    let (r0, tr) = cell(row, nrows);
    let (c0, tc) = cell(col, ncols);
    let r1 = (r0 + 1).min(nrows - 1);
    let c1 = (c0 + 1).min(ncols - 1);

    let v00 = field[[r0, c0]];
    let v01 = field[[r0, c1]];
    let v10 = field[[r1, c0]];
    let v11 = field[[r1, c1]];

    (1.0 - tr) * ((1.0 - tc) * v00 + tc * v01) + tr * ((1.0 - tc) * v10 + tc * v11)
}

/// Lower cell index and fractional offset, keeping the last sample inside
/// the final cell.
fn cell(x: f64, n: usize) -> (usize, f64) {
    if n < 2 {
        return (0, 0.0);
    }
    let i0 = (x.floor() as usize).min(n - 2);
    (i0, (x - i0 as f64).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_bilinear_exact_gridpoint() {
        let field = Array2::from_shape_fn((5, 5), |(r, c)| (r * 10 + c) as f64);
        let val = bilinear_sample(&field.view(), 2.0, 2.0);
        assert!((val - 22.0).abs() < 1e-10, "val = {val}, expected 22");
    }

    #[test]
    fn test_bilinear_constant_field() {
        let field = Array2::from_elem((5, 5), 7.0);
        let val = bilinear_sample(&field.view(), 1.5, 2.5);
        assert!((val - 7.0).abs() < 1e-10, "Constant field interpolation");
    }

    #[test]
    fn test_bilinear_linear_field() {
        // f(r, c) = r + 2c is reproduced exactly
        let field = Array2::from_shape_fn((11, 11), |(r, c)| r as f64 + 2.0 * c as f64);
        let val = bilinear_sample(&field.view(), 3.5, 6.25);
        assert!((val - 16.0).abs() < 1e-10, "Linear interpolation: {val}");
    }

    #[test]
    fn test_bilinear_last_edge_inclusive() {
        let field = Array2::from_shape_fn((4, 6), |(r, c)| (r * 6 + c) as f64);
        let val = bilinear_sample(&field.view(), 3.0, 5.0);
        assert!((val - 23.0).abs() < 1e-12);
    }

    #[test]
    fn test_bilinear_outside_is_zero() {
        let field = Array2::from_elem((5, 5), 3.0);
        assert_eq!(bilinear_sample(&field.view(), -0.01, 2.0), 0.0);
        assert_eq!(bilinear_sample(&field.view(), 2.0, 4.01), 0.0);
        assert_eq!(bilinear_sample(&field.view(), f64::NAN, 2.0), 0.0);
    }

    #[test]
    fn test_bilinear_single_row() {
        let field = Array2::from_shape_fn((1, 5), |(_, c)| c as f64);
        assert!((bilinear_sample(&field.view(), 0.0, 2.5) - 2.5).abs() < 1e-12);
        assert_eq!(bilinear_sample(&field.view(), 0.5, 2.5), 0.0);
    }
}
