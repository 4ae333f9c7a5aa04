// ─────────────────────────────────────────────────────────────────────
// SCPN Abel Core — Polar Reprojection & Speed Distribution
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Polar resampling of a reconstructed slice and the angle-integrated
//! speed distribution.
//!
//! Pixel `(row, col)` sits at `x = col - cols/2`, `y = row - rows/2`.
//! The polar grid spans the observed radius and angle ranges with
//! `floor(r_max)` radial and `rows / 2` angular samples; each sample is
//! read back with bilinear interpolation, zero outside the image.

use abel_math::interp::bilinear_sample;
use abel_types::error::{AbelError, AbelResult};
use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Coordinates of a polar resampling.
#[derive(Debug, Clone)]
pub struct PolarGrid {
    /// Radius of each row of the polar image, in pixels.
    pub radii: Array1<f64>,
    /// Angle of each column of the polar image, radians in `(-π, π]`.
    pub angles: Array1<f64>,
    /// `(row, col)` of the polar origin in the source image.
    pub origin: (usize, usize),
}

/// Resample `image` onto a regular `(radius, angle)` grid.
///
/// Returns the polar image, shaped `[radii, angles]`, and its grid.
pub fn reproject_into_polar(image: ArrayView2<f64>) -> AbelResult<(Array2<f64>, PolarGrid)> {
    let (rows, cols) = image.dim();
    let origin = (rows / 2, cols / 2);

    let mut r_min = f64::INFINITY;
    let mut r_max = 0.0_f64;
    let mut t_min = f64::INFINITY;
    let mut t_max = f64::NEG_INFINITY;
    for i in 0..rows {
        let y = i as f64 - origin.0 as f64;
        for j in 0..cols {
            let x = j as f64 - origin.1 as f64;
            let r = x.hypot(y);
            let t = y.atan2(x);
            r_min = r_min.min(r);
            r_max = r_max.max(r);
            t_min = t_min.min(t);
            t_max = t_max.max(t);
        }
    }

    let n_radii = r_max.floor() as usize;
    let n_angles = rows / 2;
    if n_radii < 2 || n_angles < 2 {
        return Err(AbelError::InsufficientResolution { rows, cols });
    }

    let radii = Array1::linspace(r_min, r_max, n_radii);
    let angles = Array1::linspace(t_min, t_max, n_angles);
    let (cos_t, sin_t): (Vec<f64>, Vec<f64>) = angles.iter().map(|t| (t.cos(), t.sin())).unzip();

    let polar = Array2::from_shape_fn((n_radii, n_angles), |(a, b)| {
        let r = radii[a];
        bilinear_sample(
            &image,
            origin.0 as f64 + r * sin_t[b],
            origin.1 as f64 + r * cos_t[b],
        )
    });

    Ok((
        polar,
        PolarGrid {
            radii,
            angles,
            origin,
        },
    ))
}

/// Angle-integrated radial profile, clipped to the inscribed radius
/// `min(rows, cols) / 2` so the image corners do not contribute.
///
/// Slices too small to resample, including a single row, give
/// `InsufficientResolution`.
pub fn extract_speeds(reconstructed: ArrayView2<f64>) -> AbelResult<Array1<f64>> {
    let (rows, cols) = reconstructed.dim();
    radial_profile(reconstructed, rows.min(cols) / 2)
}

/// Angle-integrated radial profile, keeping at most `max_bins` radii.
pub fn extract_speeds_clipped(
    reconstructed: ArrayView2<f64>,
    max_bins: usize,
) -> AbelResult<Array1<f64>> {
    if max_bins == 0 {
        return Err(AbelError::InvalidParameter(
            "max_bins must be at least 1".to_string(),
        ));
    }
    radial_profile(reconstructed, max_bins)
}

fn radial_profile(reconstructed: ArrayView2<f64>, max_bins: usize) -> AbelResult<Array1<f64>> {
    let t0 = std::time::Instant::now();
    let (polar, grid) = reproject_into_polar(reconstructed)?;
    let speeds = polar.sum_axis(Axis(1));
    let keep = max_bins.min(speeds.len());
    if keep == 0 {
        let (rows, cols) = reconstructed.dim();
        return Err(AbelError::InsufficientResolution { rows, cols });
    }
    tracing::debug!(
        bins = keep,
        angles = grid.angles.len(),
        elapsed_ms = t0.elapsed().as_secs_f64() * 1e3,
        "speed distribution extracted"
    );
    Ok(speeds.slice_move(ndarray::s![..keep]))
}
