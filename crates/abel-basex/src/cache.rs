// ─────────────────────────────────────────────────────────────────────
// SCPN Abel Core — Basis Cache
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Basis bundle cache backed by pluggable storage.
//!
//! Bundles are expensive to synthesize (minutes for 1001-pixel bases), so
//! they are keyed by `BasisConfig` and persisted as NumPy `.npz` archives:
//!
//! - current layout: `M`, `Mc`, `M_left`, `M_right`, `format_version`
//! - legacy layout:  `arr_0..arr_3` = `(M_left, M_right, M, Mc)`, unversioned
//!
//! Decoding tries the layouts in `BundleEncoding::DECODE_ORDER` and reports
//! `CacheCorrupt` only when every one of them fails. The legacy layout is
//! read, never written.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use abel_types::bundle::BasisBundle;
use abel_types::config::{BasexConfig, BasisConfig, CorruptCachePolicy};
use abel_types::constants::{BASIS_FORMAT_VERSION, DEFAULT_REGULARIZATION, LEGACY_FORMAT_VERSION};
use abel_types::error::{AbelError, AbelResult};
use ndarray::{arr1, Array1, Array2, Ix1, Ix2, OwnedRepr};
use ndarray_npy::{NpzReader, NpzWriter};

use crate::basis::{BasisSynthesizer, GaussianBasis};
use crate::operators::build_operators;

/// Persistence backend for basis bundles.
pub trait BasisStore {
    /// `Ok(None)` when nothing is stored for `config`.
    fn load(&self, config: &BasisConfig) -> AbelResult<Option<BasisBundle>>;

    /// Create or replace the stored bundle for `bundle.config()`.
    fn store(&mut self, bundle: &BasisBundle) -> AbelResult<()>;

    /// Human-readable location of `config` in this store, for logs and errors.
    fn location(&self, config: &BasisConfig) -> String;
}

/// In-process store. Lives as long as the object holding it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bundles: HashMap<BasisConfig, BasisBundle>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

impl BasisStore for MemoryStore {
    fn load(&self, config: &BasisConfig) -> AbelResult<Option<BasisBundle>> {
        Ok(self.bundles.get(config).cloned())
    }

    fn store(&mut self, bundle: &BasisBundle) -> AbelResult<()> {
        self.bundles.insert(*bundle.config(), bundle.clone());
        Ok(())
    }

    fn location(&self, config: &BasisConfig) -> String {
        format!("memory:{}", config.storage_key())
    }
}

/// Directory of `basex_basis_<size>_<basis_count>.npz` archives.
///
/// Every write lands in its own sibling temp file that is renamed over the
/// target, so concurrent readers see either the old or the new archive,
/// never a partial one. Concurrent writers of the same key: last rename wins.
#[derive(Debug, Clone)]
pub struct NpzDirStore {
    dir: PathBuf,
}

impl NpzDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        NpzDirStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, config: &BasisConfig) -> PathBuf {
        self.dir.join(config.file_name())
    }

    /// Sibling temp file unique to this write: pid plus a process-wide
    /// sequence number, so threads storing the same key never share it.
    fn temp_path_for(&self, config: &BasisConfig) -> PathBuf {
        static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            ".{}.{}.{}.tmp",
            config.file_name(),
            std::process::id(),
            seq
        ))
    }
}

impl BasisStore for NpzDirStore {
    fn load(&self, config: &BasisConfig) -> AbelResult<Option<BasisBundle>> {
        let path = self.path_for(config);
        if !path.exists() {
            return Ok(None);
        }
        let location = path.display().to_string();
        let file = File::open(&path)?;
        let mut npz = NpzReader::new(file).map_err(|e| AbelError::CacheCorrupt {
            location: location.clone(),
            reason: format!("not an npz archive: {e}"),
        })?;
        decode_bundle(&mut npz, config, &location).map(Some)
    }

    fn store(&mut self, bundle: &BasisBundle) -> AbelResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(bundle.config());
        let tmp = self.temp_path_for(bundle.config());

        let written = File::create(&tmp)
            .map_err(AbelError::from)
            .and_then(|file| write_current(bundle, file));
        if let Err(e) = written {
            fs::remove_file(&tmp).ok();
            return Err(e);
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn location(&self, config: &BasisConfig) -> String {
        self.path_for(config).display().to_string()
    }
}

/// On-disk layouts, in decoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleEncoding {
    /// `(M, Mc, M_left, M_right, format_version)`
    Current,
    /// `(M_left, M_right, M, Mc)` as positional `arr_0..arr_3`
    Legacy,
}

impl BundleEncoding {
    pub const DECODE_ORDER: [BundleEncoding; 2] = [BundleEncoding::Current, BundleEncoding::Legacy];

    fn decode<R: Read + Seek>(
        self,
        npz: &mut NpzReader<R>,
        config: &BasisConfig,
    ) -> Result<BasisBundle, String> {
        let bundle = match self {
            BundleEncoding::Current => {
                let version = read_version(npz)?;
                if !(1..=BASIS_FORMAT_VERSION).contains(&version) {
                    return Err(format!(
                        "unsupported format_version {version} (this build reads up to {BASIS_FORMAT_VERSION})"
                    ));
                }
                let m = read_array2(npz, "M")?;
                let mc = read_array2(npz, "Mc")?;
                let left = read_array2(npz, "M_left")?;
                let right = read_array2(npz, "M_right")?;
                BasisBundle::new(*config, m, mc, left, right, version)
            }
            BundleEncoding::Legacy => {
                let left = read_array2(npz, "arr_0")?;
                let right = read_array2(npz, "arr_1")?;
                let m = read_array2(npz, "arr_2")?;
                let mc = read_array2(npz, "arr_3")?;
                BasisBundle::new(*config, m, mc, left, right, LEGACY_FORMAT_VERSION)
            }
        }
        .map_err(|e| e.to_string())?;

        if !bundle.is_finite() {
            return Err("non-finite matrix entries".to_string());
        }
        Ok(bundle)
    }
}

/// Try every known layout; `CacheCorrupt` lists why each one failed.
pub fn decode_bundle<R: Read + Seek>(
    npz: &mut NpzReader<R>,
    config: &BasisConfig,
    location: &str,
) -> AbelResult<BasisBundle> {
    let mut failures = Vec::with_capacity(BundleEncoding::DECODE_ORDER.len());
    for encoding in BundleEncoding::DECODE_ORDER {
        match encoding.decode(npz, config) {
            Ok(bundle) => {
                if encoding == BundleEncoding::Legacy {
                    tracing::warn!(location, "loaded basis set in legacy layout");
                }
                return Ok(bundle);
            }
            Err(reason) => failures.push(format!("{encoding:?}: {reason}")),
        }
    }
    Err(AbelError::CacheCorrupt {
        location: location.to_string(),
        reason: failures.join("; "),
    })
}

/// Serialize `bundle` in the current layout, tagged with the current version.
pub fn write_current<W: Write + Seek>(bundle: &BasisBundle, writer: W) -> AbelResult<()> {
    let storage = |e: ndarray_npy::WriteNpzError| AbelError::Storage(e.to_string());
    let mut npz = NpzWriter::new(writer);
    npz.add_array("M", bundle.m()).map_err(storage)?;
    npz.add_array("Mc", bundle.mc()).map_err(storage)?;
    npz.add_array("M_left", bundle.op_left()).map_err(storage)?;
    npz.add_array("M_right", bundle.op_right()).map_err(storage)?;
    npz.add_array("format_version", &arr1(&[BASIS_FORMAT_VERSION]))
        .map_err(storage)?;
    npz.finish().map_err(storage)?;
    Ok(())
}

fn read_array2<R: Read + Seek>(npz: &mut NpzReader<R>, key: &str) -> Result<Array2<f64>, String> {
    npz.by_name::<OwnedRepr<f64>, Ix2>(&format!("{key}.npy"))
        .or_else(|_| npz.by_name::<OwnedRepr<f64>, Ix2>(key))
        .map_err(|e| format!("failed to read {key}: {e}"))
}

fn read_version<R: Read + Seek>(npz: &mut NpzReader<R>) -> Result<i64, String> {
    let v: Array1<i64> = npz
        .by_name::<OwnedRepr<i64>, Ix1>("format_version.npy")
        .or_else(|_| npz.by_name::<OwnedRepr<i64>, Ix1>("format_version"))
        .map_err(|e| format!("failed to read format_version: {e}"))?;
    v.iter()
        .next()
        .copied()
        .ok_or_else(|| "format_version is empty".to_string())
}

/// Maps a `BasisConfig` to its bundle, synthesizing on a miss.
///
/// A hit never calls the synthesizer. No in-process memoization beyond the
/// store handed to `get`.
#[derive(Debug, Clone)]
pub struct BasisCache<S = GaussianBasis> {
    synthesizer: S,
    regularization: f64,
    on_corrupt: CorruptCachePolicy,
}

impl Default for BasisCache<GaussianBasis> {
    fn default() -> Self {
        Self::with_synthesizer(GaussianBasis::default())
    }
}

impl BasisCache<GaussianBasis> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache configured from the synthesis, regularization and corrupt-cache
    /// sections of a `BasexConfig`.
    pub fn from_config(config: &BasexConfig) -> AbelResult<Self> {
        Ok(Self::with_synthesizer(GaussianBasis::new(&config.synthesis)?)
            .with_regularization(config.regularization)
            .with_corrupt_policy(config.on_corrupt_cache))
    }
}

impl<S: BasisSynthesizer> BasisCache<S> {
    pub fn with_synthesizer(synthesizer: S) -> Self {
        BasisCache {
            synthesizer,
            regularization: DEFAULT_REGULARIZATION,
            on_corrupt: CorruptCachePolicy::default(),
        }
    }

    pub fn with_regularization(mut self, q: f64) -> Self {
        self.regularization = q;
        self
    }

    pub fn with_corrupt_policy(mut self, policy: CorruptCachePolicy) -> Self {
        self.on_corrupt = policy;
        self
    }

    pub fn synthesizer(&self) -> &S {
        &self.synthesizer
    }

    /// Synthesize and derive operators, bypassing storage.
    pub fn build(&self, config: &BasisConfig) -> AbelResult<BasisBundle> {
        let (m, mc) = self.synthesizer.synthesize(config)?;
        let (op_left, op_right) = build_operators(&m, &mc, self.regularization)?;
        BasisBundle::new(*config, m, mc, op_left, op_right, BASIS_FORMAT_VERSION)
    }

    /// Load the bundle for `config` from `store`, or build and persist it.
    ///
    /// Without a store the bundle is always synthesized. An unreadable
    /// stored bundle is regenerated and overwritten, or surfaced as
    /// `CacheCorrupt`, depending on the corrupt-cache policy.
    pub fn get(
        &self,
        config: &BasisConfig,
        store: Option<&mut dyn BasisStore>,
    ) -> AbelResult<BasisBundle> {
        let Some(store) = store else {
            return self.build(config);
        };
        let location = store.location(config);

        match store.load(config) {
            Ok(Some(bundle)) => {
                tracing::info!(location = %location, "loaded basis sets");
                return Ok(bundle);
            }
            Ok(None) => {
                tracing::info!(
                    location = %location,
                    "no suitable basis set found; generating a new one"
                );
            }
            Err(err @ AbelError::CacheCorrupt { .. }) => match self.on_corrupt {
                CorruptCachePolicy::Fail => return Err(err),
                CorruptCachePolicy::Regenerate => {
                    tracing::warn!(error = %err, "regenerating corrupt basis set");
                }
            },
            Err(err) => return Err(err),
        }

        let bundle = self.build(config)?;
        store.store(&bundle)?;
        tracing::info!(location = %location, "basis set saved for later use");
        Ok(bundle)
    }
}

/// Bundle for `config`, cached as npz under `basis_dir` when given.
pub fn get_basis_bundle(config: &BasisConfig, basis_dir: Option<&Path>) -> AbelResult<BasisBundle> {
    let cache = BasisCache::new();
    match basis_dir {
        Some(dir) => {
            let mut store = NpzDirStore::new(dir);
            cache.get(config, Some(&mut store))
        }
        None => cache.get(config, None),
    }
}
