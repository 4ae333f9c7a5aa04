// ─────────────────────────────────────────────────────────────────────
// SCPN Abel Core — BASEX Inverter
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Configured inverter: one `BasexConfig`, one bundle, many images.
//!
//! Centering, padding and smoothing filters belong to the caller; the
//! inverter only accepts images of exactly the configured size.

use std::time::Instant;

use abel_types::bundle::BasisBundle;
use abel_types::config::BasexConfig;
use abel_types::error::{AbelError, AbelResult};
use ndarray::{Array1, Array2, ArrayView2};

use crate::cache::{BasisCache, BasisStore, NpzDirStore};
use crate::polar::{extract_speeds, extract_speeds_clipped};
use crate::transform::transform;

/// Result of inverting one image.
#[derive(Debug, Clone)]
pub struct Inversion {
    /// Reconstructed slice, same shape as the input image.
    pub slice: Array2<f64>,
    /// Angle-integrated radial profile. `None` when not requested or when
    /// the slice is too small to resample.
    pub speeds: Option<Array1<f64>>,
}

#[derive(Debug)]
pub struct BasexInverter {
    config: BasexConfig,
    bundle: BasisBundle,
}

impl BasexInverter {
    /// Build the bundle for `config`, cached under `config.basis_dir` if set.
    pub fn new(config: BasexConfig) -> AbelResult<Self> {
        let basis = config.basis_config()?;
        let cache = BasisCache::from_config(&config)?;
        let bundle = match &config.basis_dir {
            Some(dir) => {
                let mut store = NpzDirStore::new(dir);
                cache.get(&basis, Some(&mut store))?
            }
            None => cache.get(&basis, None)?,
        };
        Ok(BasexInverter { config, bundle })
    }

    /// Like `new`, with a caller-supplied store instead of `basis_dir`.
    pub fn with_store(config: BasexConfig, store: &mut dyn BasisStore) -> AbelResult<Self> {
        let basis = config.basis_config()?;
        let bundle = BasisCache::from_config(&config)?.get(&basis, Some(store))?;
        Ok(BasexInverter { config, bundle })
    }

    /// Reuse an existing bundle. It must match the configured basis.
    pub fn with_bundle(config: BasexConfig, bundle: BasisBundle) -> AbelResult<Self> {
        let basis = config.basis_config()?;
        if *bundle.config() != basis {
            return Err(AbelError::InvalidConfiguration(format!(
                "bundle {} does not match configured {}",
                bundle.config().storage_key(),
                basis.storage_key()
            )));
        }
        Ok(BasexInverter { config, bundle })
    }

    pub fn config(&self) -> &BasexConfig {
        &self.config
    }

    pub fn bundle(&self) -> &BasisBundle {
        &self.bundle
    }

    /// Reconstruct `image` and, if configured, its speed distribution.
    pub fn invert(&self, image: ArrayView2<f64>) -> AbelResult<Inversion> {
        let t0 = Instant::now();
        let slice = transform(image, &self.bundle, self.config.dr)?;
        tracing::debug!(
            rows = slice.nrows(),
            cols = slice.ncols(),
            elapsed_ms = t0.elapsed().as_secs_f64() * 1e3,
            "image reconstructed"
        );

        if !self.config.calc_speeds {
            return Ok(Inversion {
                slice,
                speeds: None,
            });
        }

        let extracted = match self.config.speeds.max_bins {
            Some(bins) => extract_speeds_clipped(slice.view(), bins),
            None => extract_speeds(slice.view()),
        };
        let speeds = match extracted {
            Ok(speeds) => Some(speeds),
            Err(AbelError::InsufficientResolution { rows, cols }) => {
                tracing::warn!(rows, cols, "slice too small for speed distribution; skipped");
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Inversion { slice, speeds })
    }
}
