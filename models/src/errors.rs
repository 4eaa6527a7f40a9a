// models/src/errors.rs

pub use thiserror::Error;

/// A validation error raised while building domain records.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Two records in the same collection share a key.
    #[error("duplicate key '{0}'")]
    DuplicateKey(String),
    /// A key is empty or contains characters outside `[a-z0-9_]`.
    #[error("key '{0}' is invalid")]
    InvalidKey(String),
    /// A cost range whose lower bound exceeds its upper bound.
    #[error("cost range for '{key}' is inverted: {min} > {max}")]
    InvertedCostRange { key: String, min: u32, max: u32 },
    /// A required field was left empty.
    #[error("required field {0} is empty")]
    EmptyField(&'static str),
    /// A field whose value breaks a length or format rule.
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: &'static str },
    /// A status or type string that does not name a known variant.
    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ModelResult<T> = Result<T, ValidationError>;
