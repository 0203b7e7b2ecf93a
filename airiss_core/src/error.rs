//! Error types for ingest, analysis and AI feedback.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// File extension is not one of the spreadsheet/CSV types we read.
    #[error("unsupported file type '{file_name}': only .xlsx, .xls or .csv files are accepted")]
    UnsupportedFormat { file_name: String },

    /// Recognized format, but the content could not be read.
    #[error("failed to parse {file_name}: {message}")]
    Parse { file_name: String, message: String },

    /// The file has no header row to take column names from.
    #[error("{file_name} has no header row")]
    MissingHeader { file_name: String },

    #[error("unknown analysis mode '{0}' (expected text, quantitative or hybrid)")]
    UnknownMode(String),

    /// Request to the feedback API failed.
    #[error("AI feedback request failed: {0}")]
    Ai(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
