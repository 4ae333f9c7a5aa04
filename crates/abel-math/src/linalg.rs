//! Dense linear algebra for the BASEX projection operators.
//!
//! Gram matrices and a Gauss-Jordan inverse with partial pivoting. The
//! matrices involved are basis_count × basis_count, small enough that a
//! direct O(n³) elimination is the right tool.

use ndarray::{Array2, Axis};

/// Why `invert` could not produce an inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvertError {
    /// Input was `rows × cols` with `rows != cols`.
    NotSquare { rows: usize, cols: usize },
    /// Elimination met a pivot below working precision at this column.
    Singular { pivot: usize },
}

/// Gram matrix `AᵗA`.
pub fn gram(a: &Array2<f64>) -> Array2<f64> {
    a.t().dot(a)
}

/// `A + q·I` for square `A`.
pub fn add_diagonal(a: &Array2<f64>, q: f64) -> Array2<f64> {
    let mut out = a.clone();
    out.diag_mut().mapv_inplace(|v| v + q);
    out
}

/// Inverse of a square matrix by Gauss-Jordan elimination.
///
/// A pivot is rejected when its magnitude falls below
/// `n · ε · max|A|`, so nearly singular systems fail instead of
/// returning NaN/Inf-filled inverses.
pub fn invert(a: &Array2<f64>) -> Result<Array2<f64>, InvertError> {
    let (n, m) = a.dim();
    if n != m {
        return Err(InvertError::NotSquare { rows: n, cols: m });
    }

    let scale = a.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if n == 0 {
        return Ok(Array2::zeros((0, 0)));
    }
    if !scale.is_finite() || scale == 0.0 {
        return Err(InvertError::Singular { pivot: 0 });
    }
    let tol = n as f64 * f64::EPSILON * scale;

    // [A | I]
    let mut aug = Array2::<f64>::zeros((n, 2 * n));
    aug.slice_mut(ndarray::s![.., ..n]).assign(a);
    for i in 0..n {
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = 0.0_f64;
        for row in col..n {
            let v = aug[[row, col]].abs();
            if v > max_val {
                max_val = v;
                max_row = row;
            }
        }
        if !(max_val > tol) {
            return Err(InvertError::Singular { pivot: col });
        }
        if max_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        let pivot_inv = 1.0 / aug[[col, col]];
        aug.row_mut(col).mapv_inplace(|v| v * pivot_inv);
        let pivot_row = aug.row(col).to_owned();

        for (row, mut lane) in aug.axis_iter_mut(Axis(0)).enumerate() {
            if row == col {
                continue;
            }
            let factor = lane[col];
            if factor != 0.0 {
                lane.scaled_add(-factor, &pivot_row);
            }
        }
    }

    let inv = aug.slice(ndarray::s![.., n..]).to_owned();
    if inv.iter().any(|v| !v.is_finite()) {
        return Err(InvertError::Singular { pivot: n - 1 });
    }
    Ok(inv)
}
