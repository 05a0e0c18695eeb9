//! # Skirmish Development Tools
//!
//! Command-line tools for development:
//! - Catalog validation
//! - Threat scan reports over a scenario

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod scan;
pub mod validate;

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors surfaced by the tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A file could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Data failed to load.
    #[error(transparent)]
    Core(#[from] skirmish_core::error::CoreError),

    /// Report encoding failed.
    #[error("Failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result alias for the tools.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Read a text file.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })
}
