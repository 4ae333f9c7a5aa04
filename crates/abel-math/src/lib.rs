//! Numerical primitives for SCPN Abel Core.

pub mod interp;
pub mod linalg;
pub mod special;
