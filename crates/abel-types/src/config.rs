// ─────────────────────────────────────────────────────────────────────
// SCPN Abel Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_REGULARIZATION, MAX_BASIS_SET_OFFSET};
use crate::error::{AbelError, AbelResult};

/// Identity of a basis bundle: detector size and number of basis functions.
///
/// Always valid once constructed: `size` odd, `1 <= basis_count <= size / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBasisConfig", into = "RawBasisConfig")]
pub struct BasisConfig {
    size: usize,
    basis_count: usize,
}

#[derive(Serialize, Deserialize)]
struct RawBasisConfig {
    size: usize,
    basis_count: usize,
}

impl TryFrom<RawBasisConfig> for BasisConfig {
    type Error = AbelError;

    fn try_from(raw: RawBasisConfig) -> AbelResult<Self> {
        BasisConfig::new(raw.size, raw.basis_count)
    }
}

impl From<BasisConfig> for RawBasisConfig {
    fn from(cfg: BasisConfig) -> Self {
        RawBasisConfig {
            size: cfg.size,
            basis_count: cfg.basis_count,
        }
    }
}

impl BasisConfig {
    pub fn new(size: usize, basis_count: usize) -> AbelResult<Self> {
        if size % 2 == 0 {
            return Err(AbelError::InvalidConfiguration(format!(
                "size must be odd, got {size}"
            )));
        }
        if basis_count == 0 {
            return Err(AbelError::InvalidConfiguration(
                "basis_count must be at least 1".to_string(),
            ));
        }
        if basis_count > size / 2 {
            return Err(AbelError::InvalidConfiguration(format!(
                "basis_count {basis_count} exceeds size/2 = {} for size {size}",
                size / 2
            )));
        }
        Ok(Self { size, basis_count })
    }

    /// One basis function per pixel of the half-line: `basis_count = size / 2`.
    pub fn auto(size: usize) -> AbelResult<Self> {
        Self::new(size, size / 2)
    }

    /// `2 * (n / 2) + 1`: the correction an orchestration layer applies
    /// before building a config. Never applied implicitly.
    pub fn nearest_odd(n: usize) -> usize {
        2 * (n / 2) + 1
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn basis_count(&self) -> usize {
        self.basis_count
    }

    /// Zero-based index of the central pixel.
    pub fn center(&self) -> usize {
        self.size / 2
    }

    /// Storage key shared by every persistence backend.
    pub fn storage_key(&self) -> String {
        format!("basex_basis_{}_{}", self.size, self.basis_count)
    }

    /// File name of the npz archive holding this bundle.
    pub fn file_name(&self) -> String {
        format!("{}.npz", self.storage_key())
    }
}

/// What to do when a stored bundle cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptCachePolicy {
    /// Synthesize a fresh bundle and overwrite the unreadable one.
    #[default]
    Regenerate,
    /// Surface `AbelError::CacheCorrupt` to the caller.
    Fail,
}

/// Basis synthesis tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisParams {
    /// Truncation knob of the projection series (default: 4000)
    #[serde(default = "default_offset_cap")]
    pub offset_cap: usize,
    /// Compute basis columns on the rayon pool (default: true)
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_offset_cap() -> usize {
    MAX_BASIS_SET_OFFSET
}
fn default_parallel() -> bool {
    true
}

impl Default for SynthesisParams {
    fn default() -> Self {
        SynthesisParams {
            offset_cap: default_offset_cap(),
            parallel: default_parallel(),
        }
    }
}

/// Speed distribution extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeedParams {
    /// Radial bins kept. `None` keeps the inscribed radius `min(rows, cols) / 2`.
    #[serde(default)]
    pub max_bins: Option<usize>,
}

/// Top-level BASEX configuration, loadable from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasexConfig {
    pub size: usize,
    /// `None` selects `size / 2`.
    #[serde(default)]
    pub basis_count: Option<usize>,
    #[serde(default = "default_dr")]
    pub dr: f64,
    #[serde(default = "default_regularization")]
    pub regularization: f64,
    /// Directory of persisted bundles; `None` disables persistence.
    #[serde(default)]
    pub basis_dir: Option<PathBuf>,
    #[serde(default)]
    pub calc_speeds: bool,
    #[serde(default)]
    pub synthesis: SynthesisParams,
    #[serde(default)]
    pub speeds: SpeedParams,
    #[serde(default)]
    pub on_corrupt_cache: CorruptCachePolicy,
}

fn default_dr() -> f64 {
    1.0
}
fn default_regularization() -> f64 {
    DEFAULT_REGULARIZATION
}

impl BasexConfig {
    /// Config with every optional field at its default.
    pub fn with_size(size: usize) -> Self {
        BasexConfig {
            size,
            basis_count: None,
            dr: default_dr(),
            regularization: default_regularization(),
            basis_dir: None,
            calc_speeds: false,
            synthesis: SynthesisParams::default(),
            speeds: SpeedParams::default(),
            on_corrupt_cache: CorruptCachePolicy::default(),
        }
    }

    /// Load from a JSON file.
    pub fn from_file(path: &str) -> AbelResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the basis count and validate the scalar parameters.
    pub fn basis_config(&self) -> AbelResult<BasisConfig> {
        if !(self.dr.is_finite() && self.dr > 0.0) {
            return Err(AbelError::InvalidParameter(format!(
                "dr must be positive, got {}",
                self.dr
            )));
        }
        if !(self.regularization.is_finite() && self.regularization >= 0.0) {
            return Err(AbelError::InvalidParameter(format!(
                "regularization must be finite and non-negative, got {}",
                self.regularization
            )));
        }
        let nbf = match self.basis_count {
            Some(nbf) => {
                if nbf != self.size / 2 {
                    tracing::warn!(
                        basis_count = nbf,
                        expected = self.size / 2,
                        "basis_count differs from size/2; this regime is not validated"
                    );
                }
                nbf
            }
            None => self.size / 2,
        };
        BasisConfig::new(self.size, nbf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basis_config_accepts_odd_sizes() {
        let cfg = BasisConfig::new(51, 25).unwrap();
        assert_eq!(cfg.size(), 51);
        assert_eq!(cfg.basis_count(), 25);
        assert_eq!(cfg.center(), 25);
    }

    #[test]
    fn test_basis_config_rejects_even_size() {
        let err = BasisConfig::new(100, 10).unwrap_err();
        assert!(matches!(err, AbelError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_basis_config_rejects_too_many_functions() {
        assert!(BasisConfig::new(51, 25).is_ok());
        let err = BasisConfig::new(51, 26).unwrap_err();
        assert!(matches!(err, AbelError::InvalidConfiguration(_)));
        assert!(BasisConfig::new(51, 0).is_err());
        assert!(BasisConfig::new(1, 1).is_err());
    }

    #[test]
    fn test_auto_and_nearest_odd() {
        assert_eq!(BasisConfig::auto(501).unwrap().basis_count(), 250);
        assert_eq!(BasisConfig::nearest_odd(100), 101);
        assert_eq!(BasisConfig::nearest_odd(101), 101);
    }

    #[test]
    fn test_storage_key_format() {
        let cfg = BasisConfig::new(1001, 500).unwrap();
        assert_eq!(cfg.storage_key(), "basex_basis_1001_500");
        assert_eq!(cfg.file_name(), "basex_basis_1001_500.npz");
    }

    #[test]
    fn test_basis_config_deserialize_validates() {
        let ok: BasisConfig = serde_json::from_str(r#"{"size": 11, "basis_count": 5}"#).unwrap();
        assert_eq!(ok, BasisConfig::new(11, 5).unwrap());
        let bad: Result<BasisConfig, _> = serde_json::from_str(r#"{"size": 10, "basis_count": 5}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_basex_config_defaults() {
        let cfg: BasexConfig = serde_json::from_str(r#"{"size": 101}"#).unwrap();
        assert_eq!(cfg.basis_count, None);
        assert!((cfg.dr - 1.0).abs() < 1e-15);
        assert!((cfg.regularization - 1.0).abs() < 1e-15);
        assert!(cfg.basis_dir.is_none());
        assert!(!cfg.calc_speeds);
        assert_eq!(cfg.synthesis.offset_cap, 4000);
        assert!(cfg.synthesis.parallel);
        assert_eq!(cfg.speeds.max_bins, None);
        assert_eq!(cfg.on_corrupt_cache, CorruptCachePolicy::Regenerate);
        assert_eq!(cfg.basis_config().unwrap().basis_count(), 50);
    }

    #[test]
    fn test_basex_config_full_json() {
        let json = r#"{
            "size": 201,
            "basis_count": 80,
            "dr": 0.5,
            "regularization": 2.0,
            "basis_dir": "/tmp/bases",
            "calc_speeds": true,
            "synthesis": {"offset_cap": 100, "parallel": false},
            "speeds": {"max_bins": 90},
            "on_corrupt_cache": "fail"
        }"#;
        let cfg: BasexConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.basis_dir, Some(PathBuf::from("/tmp/bases")));
        assert_eq!(cfg.synthesis.offset_cap, 100);
        assert!(!cfg.synthesis.parallel);
        assert_eq!(cfg.speeds.max_bins, Some(90));
        assert_eq!(cfg.on_corrupt_cache, CorruptCachePolicy::Fail);
        let basis = cfg.basis_config().unwrap();
        assert_eq!(basis.basis_count(), 80);
    }

    #[test]
    fn test_basex_config_rejects_bad_scalars() {
        let mut cfg = BasexConfig::with_size(51);
        cfg.dr = 0.0;
        assert!(matches!(
            cfg.basis_config(),
            Err(AbelError::InvalidParameter(_))
        ));
        cfg.dr = 1.0;
        cfg.regularization = f64::NAN;
        assert!(matches!(
            cfg.basis_config(),
            Err(AbelError::InvalidParameter(_))
        ));
        cfg.regularization = 1.0;
        cfg.size = 50;
        assert!(matches!(
            cfg.basis_config(),
            Err(AbelError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_from_file_roundtrip() {
        let cfg = BasexConfig::with_size(31);
        let path = std::env::temp_dir().join(format!("abel_config_{}.json", std::process::id()));
        std::fs::write(&path, serde_json::to_string_pretty(&cfg).unwrap()).unwrap();
        let loaded = BasexConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.size, 31);
        assert_eq!(loaded.synthesis.offset_cap, cfg.synthesis.offset_cap);
        std::fs::remove_file(path).ok();
    }
}
