// ─────────────────────────────────────────────────────────────────────
// SCPN Abel Core — Basis Synthesis
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Gaussian basis sets for the BASEX method.
//!
//! Column `k` of `Mc` samples the radial function
//! `ρ_k(r) = (e/k²)^{k²} r^{2k²} e^{-r²}`, column `k` of `M` its analytic
//! Abel projection. The projection is a finite series whose individual
//! factors (factorials of `k²`, powers `l^{2p}`) overflow f64 long before
//! `k` reaches realistic basis counts, so every term is assembled in log
//! space and exponentiated once.
//!
//! The series over `p` is truncated to a window of half-width
//! `Δ(k) = max(32k − cap, cap)` around `l²`. This bounds run time for large
//! bases; the cap is an empirically tuned knob, not an error bound.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use abel_math::special::LnGammaTable;
use abel_types::config::{BasisConfig, SynthesisParams};
use abel_types::constants::{MAX_BASIS_SET_OFFSET, OFFSET_SLOPE, PROGRESS_STRIDE};
use abel_types::error::{AbelError, AbelResult};
use ndarray::{Array1, Array2};
use rayon::prelude::*;

/// Source of raw `(M, Mc)` basis matrices for a configuration.
pub trait BasisSynthesizer {
    fn synthesize(&self, config: &BasisConfig) -> AbelResult<(Array2<f64>, Array2<f64>)>;
}

/// Closed-form Gaussian basis of Dribinski et al. (2002).
#[derive(Debug, Clone)]
pub struct GaussianBasis {
    offset_cap: usize,
    parallel: bool,
}

impl Default for GaussianBasis {
    fn default() -> Self {
        GaussianBasis {
            offset_cap: MAX_BASIS_SET_OFFSET,
            parallel: true,
        }
    }
}

/// Per-configuration data shared by all columns.
struct ColumnContext {
    size: usize,
    center: usize,
    table: LnGammaTable,
    /// exp(-l²) for l in 0..=center
    gaussian: Vec<f64>,
}

impl GaussianBasis {
    pub fn new(params: &SynthesisParams) -> AbelResult<Self> {
        if params.offset_cap == 0 {
            return Err(AbelError::InvalidConfiguration(
                "synthesis offset_cap must be positive".to_string(),
            ));
        }
        Ok(GaussianBasis {
            offset_cap: params.offset_cap,
            parallel: params.parallel,
        })
    }

    /// Single-threaded synthesis with the default truncation window.
    pub fn sequential() -> Self {
        GaussianBasis {
            parallel: false,
            ..Self::default()
        }
    }

    pub fn offset_cap(&self) -> usize {
        self.offset_cap
    }

    /// Half-width `Δ(k)` of the truncated series window.
    pub fn window_half_width(&self, k: usize) -> usize {
        (OFFSET_SLOPE * k)
            .saturating_sub(self.offset_cap)
            .max(self.offset_cap)
    }

    /// Column `k >= 1` of `(M, Mc)`.
    fn column(&self, k: usize, ctx: &ColumnContext) -> (Vec<f64>, Vec<f64>) {
        let n = ctx.size;
        let c = ctx.center;
        let table = &ctx.table;
        let mut m = vec![0.0; n];
        let mut mc = vec![0.0; n];

        let kf = k as f64;
        let k2 = k * k;
        let k2f = k2 as f64;
        let ln_gamma_half = table.ln_gamma_half(0);

        // angn = (e/k²)^{k²} Γ(k²+½)/Γ(½); the Γ ratio alone overflows past k ≈ 13
        let angn = (k2f - 2.0 * k2f * kf.ln() + table.ln_gamma_half(k2) - ln_gamma_half).exp();
        m[c] = 2.0 * angn;

        let delta = self.window_half_width(k);
        // p-independent part of every series exponent
        let base = k2f - k2f * k2f.ln() + table.ln_factorial(k2) - ln_gamma_half;

        for l in 1..=c {
            let l2 = l * l;
            let l2f = l2 as f64;
            let ln_l2 = l2f.ln();

            let val = (k2f - l2f + 2.0 * k2f * (l as f64 / kf).ln()).exp();
            mc[c + l] = val;
            mc[c - l] = val;

            let mut aux = val + angn * ctx.gaussian[l];

            let p_lo = l2.saturating_sub(delta).max(1);
            let p_hi = (k2 - 1).min(l2 + delta);
            for p in p_lo..=p_hi {
                let exponent = base - l2f + p as f64 * ln_l2 - table.ln_factorial(p)
                    + table.ln_gamma_half(k2 - p)
                    - table.ln_factorial(k2 - p);
                aux += exponent.exp();
            }

            aux *= 2.0;
            m[c + l] = aux;
            m[c - l] = aux;
        }

        (m, mc)
    }
}

impl BasisSynthesizer for GaussianBasis {
    fn synthesize(&self, config: &BasisConfig) -> AbelResult<(Array2<f64>, Array2<f64>)> {
        let n = config.size();
        let nbf = config.basis_count();
        let c = config.center();
        let start = Instant::now();
        tracing::info!(
            size = n,
            basis_count = nbf,
            parallel = self.parallel,
            "generating BASEX basis sets"
        );

        let kmax = nbf - 1;
        let ctx = ColumnContext {
            size: n,
            center: c,
            table: LnGammaTable::new(kmax * kmax),
            gaussian: (0..=c).map(|l| (-((l * l) as f64)).exp()).collect(),
        };

        let mut m = Array2::zeros((n, nbf));
        let mut mc = Array2::zeros((n, nbf));
        for i in 0..n {
            let g = ctx.gaussian[i.abs_diff(c)];
            m[[i, 0]] = 2.0 * g;
            mc[[i, 0]] = g;
        }

        let done = AtomicUsize::new(0);
        let column = |k: usize| {
            let col = self.column(k, &ctx);
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            if finished % PROGRESS_STRIDE == 0 {
                tracing::debug!(completed = finished, total = kmax, "basis columns");
            }
            col
        };
        let columns: Vec<(Vec<f64>, Vec<f64>)> = if self.parallel {
            (1..nbf).into_par_iter().map(&column).collect()
        } else {
            (1..nbf).map(&column).collect()
        };

        for (k, (m_col, mc_col)) in (1..nbf).zip(columns) {
            m.column_mut(k).assign(&Array1::from(m_col));
            mc.column_mut(k).assign(&Array1::from(mc_col));
        }

        if let Some(k) = first_non_finite_column(&m).or_else(|| first_non_finite_column(&mc)) {
            return Err(AbelError::InvalidConfiguration(format!(
                "basis synthesis for size {n}, basis_count {nbf} left f64 range at column {k}"
            )));
        }

        tracing::info!(
            size = n,
            basis_count = nbf,
            elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
            "basis sets generated"
        );
        Ok((m, mc))
    }
}

fn first_non_finite_column(a: &Array2<f64>) -> Option<usize> {
    a.columns()
        .into_iter()
        .position(|col| col.iter().any(|v| !v.is_finite()))
}

/// Synthesize `(M, Mc)` with the default Gaussian basis.
///
/// Rejects even sizes and `basis_count > size / 2` with
/// `AbelError::InvalidConfiguration`.
pub fn synthesize(size: usize, basis_count: usize) -> AbelResult<(Array2<f64>, Array2<f64>)> {
    let config = BasisConfig::new(size, basis_count)?;
    GaussianBasis::default().synthesize(&config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel_close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * b.abs().max(1e-300)
    }

    #[test]
    fn test_gaussian_column() {
        let (m, mc) = synthesize(51, 25).unwrap();
        assert_eq!(m.dim(), (51, 25));
        assert_eq!(mc.dim(), (51, 25));
        assert!((mc[[25, 0]] - 1.0).abs() < 1e-15);
        assert!((m[[25, 0]] - 2.0).abs() < 1e-15);
        assert!((m[[26, 0]] - 2.0 * (-1.0_f64).exp()).abs() < 1e-15);
        assert!((mc[[22, 0]] - (-9.0_f64).exp()).abs() < 1e-15);
    }

    #[test]
    fn test_smallest_basis() {
        let (m, mc) = synthesize(3, 1).unwrap();
        let e1 = (-1.0_f64).exp();
        assert!((m[[0, 0]] - 2.0 * e1).abs() < 1e-15);
        assert!((m[[1, 0]] - 2.0).abs() < 1e-15);
        assert!((mc[[2, 0]] - e1).abs() < 1e-15);
    }

    #[test]
    fn test_reference_values() {
        let (m, mc) = synthesize(51, 25).unwrap();
        // angn(1) = e/2 → M[center, 1] = e
        assert!(rel_close(m[[25, 1]], std::f64::consts::E, 1e-12));
        assert_eq!(mc[[25, 1]], 0.0);
        assert!(rel_close(m[[26, 1]], 3.0, 1e-12));
        assert!(rel_close(mc[[26, 1]], 1.0, 1e-12));
        assert!(rel_close(m[[28, 5]], 3.572_299_769_598_135_6, 1e-9));
        assert!(rel_close(mc[[28, 5]], 7.182_476_763_209_172e-5, 1e-9));
        assert!(rel_close(m[[18, 10]], 3.983_619_181_873_322, 1e-9));
        assert!(rel_close(mc[[18, 10]], 1.474_438_219_636_280_7e-9, 1e-9));
        assert!(rel_close(m[[37, 12]], 8.594_419_663_135_628, 1e-9));
        assert!(rel_close(m[[49, 24]], 12.035_727_105_073_564, 1e-9));
        assert!(rel_close(mc[[49, 24]], 1.0, 1e-12));
    }

    #[test]
    fn test_columns_are_symmetric() {
        let (m, mc) = synthesize(41, 20).unwrap();
        for k in 0..20 {
            for l in 1..=20 {
                assert_eq!(m[[20 + l, k]], m[[20 - l, k]], "M col {k} offset {l}");
                assert_eq!(mc[[20 + l, k]], mc[[20 - l, k]], "Mc col {k} offset {l}");
            }
        }
    }

    #[test]
    fn test_central_basis_peaks_on_its_ring() {
        let (_, mc) = synthesize(61, 30).unwrap();
        for k in 1..30 {
            // ρ_k(r) is maximal (= 1) at r = k
            assert!(rel_close(mc[[30 + k, k]], 1.0, 1e-12), "k = {k}");
            let col_max = mc.column(k).iter().cloned().fold(0.0, f64::max);
            assert!(rel_close(col_max, 1.0, 1e-12));
        }
    }

    #[test]
    fn test_synthesis_is_finite() {
        for &(n, nbf) in &[(3, 1), (11, 5), (51, 25), (101, 50), (101, 13)] {
            let (m, mc) = synthesize(n, nbf).unwrap();
            assert!(m.iter().all(|v| v.is_finite()), "M non-finite for {n}/{nbf}");
            assert!(mc.iter().all(|v| v.is_finite()), "Mc non-finite for {n}/{nbf}");
        }
    }

    #[test]
    fn test_narrow_window_stays_finite_and_close() {
        let cfg = BasisConfig::new(51, 25).unwrap();
        let narrow = GaussianBasis::new(&SynthesisParams {
            offset_cap: 8,
            parallel: false,
        })
        .unwrap();
        // Δ(5) = 152 truncates the series for every l > 12
        assert_eq!(narrow.window_half_width(5), 152);
        let (m_narrow, mc_narrow) = narrow.synthesize(&cfg).unwrap();
        let (m_full, mc_full) = GaussianBasis::sequential().synthesize(&cfg).unwrap();
        assert!(m_narrow.iter().all(|v| v.is_finite()));
        assert_eq!(mc_narrow, mc_full);
        let max_diff = m_narrow
            .iter()
            .zip(m_full.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        assert!(max_diff < 1e-12, "truncation error {max_diff}");
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let cfg = BasisConfig::new(61, 30).unwrap();
        let (m_par, mc_par) = GaussianBasis::default().synthesize(&cfg).unwrap();
        let (m_seq, mc_seq) = GaussianBasis::sequential().synthesize(&cfg).unwrap();
        assert_eq!(m_par, m_seq);
        assert_eq!(mc_par, mc_seq);
    }

    #[test]
    fn test_window_half_width() {
        let basis = GaussianBasis::default();
        assert_eq!(basis.offset_cap(), 4000);
        assert_eq!(basis.window_half_width(0), 4000);
        assert_eq!(basis.window_half_width(200), 4000);
        assert_eq!(basis.window_half_width(250), 4000);
        assert_eq!(basis.window_half_width(300), 5600);
    }

    #[test]
    fn test_rejects_invalid_configuration() {
        assert!(matches!(
            synthesize(100, 10),
            Err(AbelError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            synthesize(51, 26),
            Err(AbelError::InvalidConfiguration(_))
        ));
        assert!(GaussianBasis::new(&SynthesisParams {
            offset_cap: 0,
            parallel: true
        })
        .is_err());
    }
}
