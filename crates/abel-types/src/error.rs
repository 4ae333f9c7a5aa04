use thiserror::Error;

#[derive(Error, Debug)]
pub enum AbelError {
    #[error("Invalid basis configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Singular Gram matrix while building the {operator} operator (pivot {pivot})")]
    SingularBasis { operator: &'static str, pivot: usize },

    #[error("Corrupt basis cache at {location}: {reason}")]
    CacheCorrupt { location: String, reason: String },

    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Insufficient resolution for polar resampling: {rows}x{cols} image")]
    InsufficientResolution { rows: usize, cols: usize },

    #[error("Basis storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AbelResult<T> = Result<T, AbelError>;
