//! Log-Gamma lookup tables.
//!
//! The BASEX projection series needs lnΓ at integers and half-integers up
//! to `(basis_count - 1)²`, millions of times per basis. Values come from
//! `statrs` once and are then looked up.

use statrs::function::gamma::ln_gamma;

/// lnΓ(j + 1) and lnΓ(j + ½) for `j` in `0..=max`.
#[derive(Debug, Clone)]
pub struct LnGammaTable {
    integer: Vec<f64>,
    half: Vec<f64>,
}

impl LnGammaTable {
    pub fn new(max: usize) -> Self {
        let integer = (0..=max).map(|j| ln_gamma(j as f64 + 1.0)).collect();
        let half = (0..=max).map(|j| ln_gamma(j as f64 + 0.5)).collect();
        LnGammaTable { integer, half }
    }

    /// Largest argument index covered.
    pub fn max(&self) -> usize {
        self.integer.len() - 1
    }

    /// lnΓ(j + 1) = ln j!
    #[inline]
    pub fn ln_factorial(&self, j: usize) -> f64 {
        self.integer[j]
    }

    /// lnΓ(j + ½)
    #[inline]
    pub fn ln_gamma_half(&self, j: usize) -> f64 {
        self.half[j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_small_factorials() {
        let t = LnGammaTable::new(10);
        assert_eq!(t.max(), 10);
        assert!(t.ln_factorial(0).abs() < 1e-12);
        assert!(t.ln_factorial(1).abs() < 1e-12);
        assert!((t.ln_factorial(5) - 120.0_f64.ln()).abs() < 1e-12);
        assert!((t.ln_factorial(10) - 3_628_800.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn test_half_integers() {
        let t = LnGammaTable::new(4);
        // Γ(1/2) = √π, Γ(3/2) = √π/2, Γ(5/2) = 3√π/4
        assert!((t.ln_gamma_half(0) - 0.5 * PI.ln()).abs() < 1e-12);
        assert!((t.ln_gamma_half(1) - (PI.sqrt() / 2.0).ln()).abs() < 1e-12);
        assert!((t.ln_gamma_half(2) - (3.0 * PI.sqrt() / 4.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn test_large_arguments_stay_finite() {
        // 500² entries: the reference 1001-pixel basis range.
        let t = LnGammaTable::new(250_000);
        let v = t.ln_factorial(250_000);
        assert!(v.is_finite());
        // Stirling: ln n! ≈ n ln n − n + ½ ln(2πn)
        let n = 250_000.0_f64;
        let stirling = n * n.ln() - n + 0.5 * (2.0 * PI * n).ln();
        assert!((v - stirling).abs() / v < 1e-10);
        assert!(t.ln_gamma_half(250_000).is_finite());
    }
}
