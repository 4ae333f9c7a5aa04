// ─────────────────────────────────────────────────────────────────────
// SCPN Abel Core — Projection Operators
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Left/right projection operators derived from the raw basis matrices.
//!
//! `OpLeft  = (McᵗMc)⁻¹ Mcᵗ`       plain least-squares left inverse of Mc
//! `OpRight = M (MᵗM + qI)⁻¹`      Tikhonov-regularised, q = 1 by default

use abel_math::linalg::{add_diagonal, gram, invert, InvertError};
use abel_types::error::{AbelError, AbelResult};
use ndarray::Array2;

/// Build `(OpLeft, OpRight)` from `(M, Mc)`.
///
/// Fails with `SingularBasis` instead of returning NaN-filled operators
/// when a Gram matrix cannot be inverted at working precision.
pub fn build_operators(
    m: &Array2<f64>,
    mc: &Array2<f64>,
    regularization: f64,
) -> AbelResult<(Array2<f64>, Array2<f64>)> {
    if m.dim() != mc.dim() {
        return Err(AbelError::ShapeMismatch {
            expected: m.dim(),
            found: mc.dim(),
        });
    }
    if !(regularization.is_finite() && regularization >= 0.0) {
        return Err(AbelError::InvalidParameter(format!(
            "regularization must be finite and non-negative, got {regularization}"
        )));
    }

    let gram_c = invert(&gram(mc)).map_err(operator_error("left"))?;
    let op_left = gram_c.dot(&mc.t());

    let gram_m = invert(&add_diagonal(&gram(m), regularization))
        .map_err(operator_error("right"))?;
    let op_right = m.dot(&gram_m);

    Ok((op_left, op_right))
}

fn operator_error(operator: &'static str) -> impl Fn(InvertError) -> AbelError {
    move |e| match e {
        InvertError::Singular { pivot } => AbelError::SingularBasis { operator, pivot },
        InvertError::NotSquare { rows, cols } => AbelError::ShapeMismatch {
            expected: (cols, cols),
            found: (rows, cols),
        },
    }
}
