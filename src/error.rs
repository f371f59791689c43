//! Error types for firegraph.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the library layer.
#[derive(Error, Debug)]
pub enum FiregraphError {
    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read or write failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encode or decode failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input log file does not exist
    #[error("CSV file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Input log file lacks required columns
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// Preset id not in the registry
    #[error("Unknown preset '{name}'. Available: {}", .available.join(", "))]
    UnknownPreset {
        name: String,
        available: Vec<&'static str>,
    },

    /// Resolved configuration violates a range or threshold invariant
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for firegraph operations.
pub type Result<T> = std::result::Result<T, FiregraphError>;
