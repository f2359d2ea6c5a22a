use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the DeFi analyzer.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// A file could not be opened, read or written.
    #[error("Failed to access file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV document could not be read or written.
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A column the analysis depends on is absent from the input table.
    ///
    /// `available` lists every column present together with its inferred
    /// data type, e.g. `protocol: text, tvl: numeric`.
    #[error("Missing required column '{column}' (available columns: {available})")]
    MissingColumn { column: String, available: String },

    /// A chart could not be drawn or encoded.
    #[error("Chart rendering failed: {0}")]
    Chart(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be serialized.
    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AnalyzerError {
    /// Attach `path` to an I/O error.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalyzerError::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Attach `path` to a CSV error.
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        AnalyzerError::Csv {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the analyzer crates.
pub type Result<T> = std::result::Result<T, AnalyzerError>;
