//! BASEX inverse Abel transform.
//!
//! basis: Gaussian basis synthesis (M, Mc)
//! operators: left/right projection operators
//! cache: basis bundle stores (npz directory, in-memory)
//! transform, polar: reconstruction and speed distribution
//! inverter: configured end-to-end pipeline

pub mod basis;
pub mod cache;
pub mod inverter;
pub mod operators;
pub mod polar;
pub mod transform;

pub use cache::get_basis_bundle;
pub use inverter::{BasexInverter, Inversion};
pub use polar::extract_speeds;
pub use transform::transform;
