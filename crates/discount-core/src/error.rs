use std::path::PathBuf;
use thiserror::Error;

/// Hard failures of the discount dashboard.
///
/// Every variant stops the current load attempt. Soft conditions (nothing
/// usable after reconciliation, an over-narrow filter, missing band data) are
/// never errors; they travel as values through `discount_data::analysis`.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// A bundle file could not be opened or read from disk.
    #[error("Failed to read file {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A spreadsheet workbook could not be opened or one of its sheets
    /// could not be decoded.
    #[error("Failed to read workbook {}: {message}", .path.display())]
    Workbook { path: PathBuf, message: String },

    /// A CSV export could not be parsed.
    #[error("Failed to parse CSV {}: {message}", .path.display())]
    Csv { path: PathBuf, message: String },

    /// A JSON bundle could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The bundle path has an extension no reader understands.
    #[error("Unsupported bundle format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// The bundle path does not exist.
    #[error("Bundle not found: {}", .0.display())]
    BundleNotFound(PathBuf),

    /// No bundle was named and none could be discovered.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the dashboard crates.
pub type Result<T> = std::result::Result<T, DashboardError>;
