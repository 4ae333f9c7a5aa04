// ─────────────────────────────────────────────────────────────────────
// SCPN Abel Core — BASEX Transform
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Inverse Abel transform of a prepared image through a basis bundle.
//!
//! `Ci = OpLeft · image · OpRight`, `slice = Mc · Ci · Mcᵗ · MAGIC_SCALE / dr`.

use abel_types::bundle::BasisBundle;
use abel_types::constants::MAGIC_SCALE;
use abel_types::error::{AbelError, AbelResult};
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Reconstruct the central slice of the 3-D distribution.
///
/// `image` is either `size × size`, or a single `1 × size` row standing
/// for an image whose rows are all equal to it; the latter returns the
/// central row of the reconstruction (`1 × size`). Inputs are never
/// cropped or padded here.
pub fn transform(image: ArrayView2<f64>, bundle: &BasisBundle, dr: f64) -> AbelResult<Array2<f64>> {
    if !(dr.is_finite() && dr > 0.0) {
        return Err(AbelError::InvalidParameter(format!(
            "dr must be positive, got {dr}"
        )));
    }
    let n = bundle.config().size();
    let scale = MAGIC_SCALE / dr;

    match image.dim() {
        (rows, cols) if rows == n && cols == n => {
            let ci = bundle.op_left().dot(&image).dot(bundle.op_right());
            let mut slice = bundle.mc().dot(&ci).dot(&bundle.mc().t());
            slice *= scale;
            Ok(slice)
        }
        (1, cols) if cols == n => Ok(transform_row(image, bundle, scale)),
        found => Err(AbelError::ShapeMismatch {
            expected: (n, n),
            found,
        }),
    }
}

/// Broadcast row `r`: the image is `1 ⊗ r`, so `Ci = (OpLeft·1) ⊗ (r·OpRight)`
/// and the slice factorizes as `(Mc·OpLeft·1) ⊗ (r·OpRight·Mcᵗ)`.
fn transform_row(row: ArrayView2<f64>, bundle: &BasisBundle, scale: f64) -> Array2<f64> {
    let center = bundle.config().center();
    let row_sums: Array1<f64> = bundle.op_left().sum_axis(Axis(1));
    let weight = bundle.mc().row(center).dot(&row_sums) * scale;

    let mut out = row.dot(bundle.op_right()).dot(&bundle.mc().t());
    out *= weight;
    out
}
