//! Error types for the exercise HMM fitting pipeline.
//!
//! Every module that can fail imports its error type from here, keeping the
//! hierarchy in one place.
//!
//! ## Hierarchy
//!
//! ```text
//! FitError (top-level)
//! └── ConfigError  (config validation / file loading)
//! ```
//!
//! Frame-level problems (low visibility, degenerate body scale) are *not*
//! errors: the normalizer returns `None` and the corpus builder counts the
//! frame as skipped.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::FrameLabel;

// ---------------------------------------------------------------------------
// FitResult
// ---------------------------------------------------------------------------

/// Convenient `Result` alias used throughout the crate.
pub type FitResult<T> = Result<T, FitError>;

// ---------------------------------------------------------------------------
// FitError
// ---------------------------------------------------------------------------

/// Top-level error type for fitting, decoding and model persistence.
#[derive(Debug, Error)]
pub enum FitError {
    /// A configuration validation or loading error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The forward pass produced no usable frames at all.
    #[error("No usable frames extracted; the corpus is empty")]
    EmptyCorpus,

    /// One of the label buckets has no feature vectors, so its emission
    /// cannot be estimated.
    #[error("State {label} has no frames; adjust the knee-angle thresholds")]
    EmptyState {
        /// The label with no assigned frames.
        label: FrameLabel,
    },

    /// A feature vector or parameter block has the wrong dimensionality.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// The decoder was asked to score an empty observation sequence.
    #[error("Cannot decode an empty observation sequence")]
    EmptySequence,

    /// Feature and label sequences passed together differ in length.
    #[error("Sequence length mismatch: {features} feature vectors vs {labels} labels")]
    LengthMismatch {
        /// Number of feature vectors.
        features: usize,
        /// Number of labels.
        labels: usize,
    },

    /// A feature vector holds a NaN or infinite component.
    #[error("Feature vector {index} has non-finite components")]
    NonFiniteFeature {
        /// Position of the offending vector in its sequence.
        index: usize,
    },

    /// A line of a frame file is not a valid pose frame.
    #[error("Invalid pose frame at `{path}` line {line}: {source}")]
    InvalidFrame {
        /// File being read.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Underlying JSON parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A repetition interval does not fit inside the feature sequence.
    #[error("Repetition [{start}, {end}] is out of bounds for a sequence of length {len}")]
    RepetitionOutOfBounds {
        /// First frame of the repetition.
        start: usize,
        /// Last frame of the repetition (inclusive).
        end: usize,
        /// Length of the feature sequence.
        len: usize,
    },

    /// A persisted model failed structural or numeric validation.
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A file could not be read or written.
    #[error("I/O error on `{path}`: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl FitError {
    /// Construct a [`FitError::InvalidModel`].
    pub fn invalid_model<S: Into<String>>(msg: S) -> Self {
        FitError::InvalidModel(msg.into())
    }

    /// Construct a [`FitError::Io`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FitError::Io { path: path.into(), source }
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors produced when loading or validating an [`HmmConfig`].
///
/// [`HmmConfig`]: crate::config::HmmConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has an invalid value.
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the field.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// A configuration file could not be read from disk.
    #[error("Cannot read config file `{path}`: {source}")]
    FileRead {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file contains malformed JSON.
    #[error("Cannot parse config file `{path}`: {source}")]
    ParseError {
        /// Path that was being parsed.
        path: PathBuf,
        /// Underlying JSON parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Construct a [`ConfigError::InvalidValue`].
    pub fn invalid_value<S: Into<String>>(field: &'static str, reason: S) -> Self {
        ConfigError::InvalidValue { field, reason: reason.into() }
    }
}
