use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, assembling or aggregating record data.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The requested record file does not exist.
    #[error("Can not find data file {path}")]
    NotFound { path: PathBuf },
    /// The pattern matched no files, or every matched file was empty.
    #[error("No data rows found for pattern '{pattern}'")]
    EmptyDataset { pattern: String },
    /// Reading or writing a file failed.
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file is not valid JSON.
    #[error("Invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The JSON is valid but is neither an object nor an array of objects.
    #[error("Unsupported record layout in {path}: expected an object or an array of objects")]
    Layout { path: PathBuf },
    /// The CSV file could not be read.
    #[error("Invalid CSV in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    /// The glob pattern itself is malformed.
    #[error("Invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
    /// Granularity expression rejected under the strict policy.
    #[error("Unsupported granularity '{input}'")]
    InvalidGranularity { input: String },
}

/// Why a single row could not be turned into a record.
///
/// Never propagated past the filter: the row is dropped and counted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecord {
    #[error("missing required column '{column}'")]
    Missing { column: String },
    #[error("invalid value {value} in column '{column}'")]
    Invalid { column: String, value: String },
}

impl MalformedRecord {
    pub(crate) fn missing(column: &str) -> Self {
        Self::Missing {
            column: column.to_string(),
        }
    }

    pub(crate) fn invalid(column: &str, value: &serde_json::Value) -> Self {
        Self::Invalid {
            column: column.to_string(),
            value: value.to_string(),
        }
    }
}
