//! Engine error types

use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors crossing the engine's boundaries.
///
/// Inside a scan these are converted into `Error`-status records at the
/// per-file boundary; only the generate step surfaces them to the caller.
#[derive(Debug, Error)]
pub enum EngineError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// XLS backend error
    #[error("XLS Error: {0}")]
    Xls(#[from] pcmscan_xls::XlsError),

    /// XLSX backend error
    #[error("XLSX Error: {0}")]
    Xlsx(#[from] pcmscan_xlsx::XlsxError),

    /// The cancel flag was raised mid-operation
    #[error("operation cancelled")]
    Cancelled,
}
