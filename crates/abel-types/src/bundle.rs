// ─────────────────────────────────────────────────────────────────────
// SCPN Abel Core — Basis Bundle
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use ndarray::Array2;

use crate::config::BasisConfig;
use crate::error::{AbelError, AbelResult};

/// The four BASEX matrices for one `BasisConfig`.
///
/// Shapes (n = size, b = basis_count):
/// - `m`, `mc`, `op_right`: n × b
/// - `op_left`: b × n
///
/// Read-only after construction, so it can be shared across threads.
#[derive(Debug, Clone)]
pub struct BasisBundle {
    config: BasisConfig,
    m: Array2<f64>,
    mc: Array2<f64>,
    op_left: Array2<f64>,
    op_right: Array2<f64>,
    format_version: i64,
}

impl BasisBundle {
    /// Assemble a bundle, checking every matrix against `config`.
    pub fn new(
        config: BasisConfig,
        m: Array2<f64>,
        mc: Array2<f64>,
        op_left: Array2<f64>,
        op_right: Array2<f64>,
        format_version: i64,
    ) -> AbelResult<Self> {
        let n = config.size();
        let b = config.basis_count();
        check_shape(&m, (n, b))?;
        check_shape(&mc, (n, b))?;
        check_shape(&op_left, (b, n))?;
        check_shape(&op_right, (n, b))?;
        Ok(BasisBundle {
            config,
            m,
            mc,
            op_left,
            op_right,
            format_version,
        })
    }

    pub fn config(&self) -> &BasisConfig {
        &self.config
    }

    /// Forward-basis amplitudes on the detector grid.
    pub fn m(&self) -> &Array2<f64> {
        &self.m
    }

    /// Central (radial) basis amplitudes.
    pub fn mc(&self) -> &Array2<f64> {
        &self.mc
    }

    pub fn op_left(&self) -> &Array2<f64> {
        &self.op_left
    }

    pub fn op_right(&self) -> &Array2<f64> {
        &self.op_right
    }

    pub fn format_version(&self) -> i64 {
        self.format_version
    }

    /// True when no matrix holds NaN or ±Inf.
    pub fn is_finite(&self) -> bool {
        [&self.m, &self.mc, &self.op_left, &self.op_right]
            .iter()
            .all(|a| a.iter().all(|v| v.is_finite()))
    }
}

fn check_shape(a: &Array2<f64>, expected: (usize, usize)) -> AbelResult<()> {
    if a.dim() != expected {
        return Err(AbelError::ShapeMismatch {
            expected,
            found: a.dim(),
        });
    }
    Ok(())
}
