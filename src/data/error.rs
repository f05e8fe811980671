use std::fmt;

use thiserror::Error;

/// A file that could not be turned into a [`RawDataset`](super::model::RawDataset).
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("{file}: row {row}, column {column}: '{token}' is not a number")]
    MalformedInput {
        file: String,
        row: usize,
        column: usize,
        token: String,
    },
    #[error("{file}: row {row}, column {column}: non-finite value '{token}'")]
    NonFiniteValue {
        file: String,
        row: usize,
        column: usize,
        token: String,
    },
    #[error("{file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },
    #[error("{file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{file}: {source}")]
    Parquet {
        file: String,
        #[source]
        source: parquet::errors::ParquetError,
    },
    #[error("{file}: {message}")]
    Arrow { file: String, message: String },
    #[error("{file}: unsupported file extension '.{extension}'")]
    UnsupportedFormat { file: String, extension: String },
}

impl LoadError {
    /// Name of the offending file.
    pub fn file(&self) -> &str {
        match self {
            LoadError::MalformedInput { file, .. }
            | LoadError::NonFiniteValue { file, .. }
            | LoadError::Csv { file, .. }
            | LoadError::Io { file, .. }
            | LoadError::Parquet { file, .. }
            | LoadError::Arrow { file, .. }
            | LoadError::UnsupportedFormat { file, .. } => file,
        }
    }
}

/// Rejected histogram parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpecError {
    #[error("domain lower bound {lower} must be below upper bound {upper}")]
    EmptyDomain { lower: f64, upper: f64 },
    #[error("domain bounds must be finite (got {lower}, {upper})")]
    NonFiniteBound { lower: f64, upper: f64 },
    #[error("bin count must be at least 1")]
    NoBins,
}

/// Non-fatal conditions reported next to a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    /// No values left to bin; the histogram is all zeros.
    EmptyDataset { name: String },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::EmptyDataset { name } => {
                write!(f, "{name}: no valid values to bin, histogram is empty")
            }
        }
    }
}
