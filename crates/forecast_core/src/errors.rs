//! Error types for the forecast core

use thiserror::Error;

use crate::serde_canon::CanonicalError;

/// Errors raised while parsing a parcel identifier (PNU)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParcelCodeError {
    #[error("parcel code must be exactly 19 characters, got {0}")]
    Length(usize),

    #[error("parcel code must contain only ASCII digits: {0}")]
    NonDigit(String),
}

/// Errors raised while writing or loading a model bundle
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// A required file is absent from the bundle directory
    #[error("missing artifact file: {0}")]
    Missing(String),

    /// Metadata, scaler and models disagree with each other
    #[error("artifact mismatch: {0}")]
    Mismatch(String),

    /// A model file does not hash to the value recorded in metadata
    #[error("artifact integrity check failed for {file}: expected {expected}, got {actual}")]
    Integrity {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("model validation failed: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("canonical serialization error: {0}")]
    Canonical(#[from] CanonicalError),
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by feature standardization
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScalerError {
    #[error("cannot fit a scaler on empty data")]
    EmptyData,

    #[error("feature count mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors raised while reading or writing a record snapshot
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
