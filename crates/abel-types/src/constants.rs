// ─────────────────────────────────────────────────────────────────────
// SCPN Abel Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Empirical scale aligning the BASEX reconstruction with the analytical
/// Abel transform normalisation. Fixed property of the Gaussian basis family.
pub const MAGIC_SCALE: f64 = 8.053;

/// Default cap on the half-width of the truncated projection series.
/// Window half-width is `max(32k - cap, cap)` for basis index `k`.
pub const MAX_BASIS_SET_OFFSET: usize = 4000;

/// Slope of the truncation window in the basis index.
pub const OFFSET_SLOPE: usize = 32;

/// Default Tikhonov constant `q` added to `MᵗM` before inversion.
pub const DEFAULT_REGULARIZATION: f64 = 1.0;

/// Version tag written with every persisted basis bundle.
pub const BASIS_FORMAT_VERSION: i64 = 1;

/// Version reported for bundles read from the unversioned legacy layout.
pub const LEGACY_FORMAT_VERSION: i64 = 0;

/// Basis columns between two progress events during synthesis.
pub const PROGRESS_STRIDE: usize = 50;
