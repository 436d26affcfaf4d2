//! # Arena Development Tools
//!
//! Command-line tools for development:
//! - Data validators (weapon catalog and scenario self-test)
//! - Headless scenario runner
//! - Replay verification

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod simulate;
pub mod validate;

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for tool operations.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Failed to read or write a file.
    #[error("{path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Core error (parse, validation, replay).
    #[error(transparent)]
    Game(#[from] arena_core::error::GameError),
    /// Failed to produce JSON output.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Read a text file, keeping the path in the error.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })
}
