//! Error types for world setup and data loading.
//!
//! Threat scanning and cloaking never fail: a rejected candidate is simply
//! not chosen. Errors only surface while building a world or loading data.

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Top-level error type for the simulation core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParseError {
        /// Name of the data source that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// A data entry references a name that was never defined.
    #[error("Unknown {kind} '{name}'")]
    UnknownName {
        /// What kind of entry was referenced (weapon, warhead, type, house).
        kind: &'static str,
        /// The unresolved name.
        name: String,
    },

    /// Two data entries share a name.
    #[error("Duplicate {kind} '{name}'")]
    DuplicateName {
        /// What kind of entry was duplicated.
        kind: &'static str,
        /// The duplicated name.
        name: String,
    },

    /// A handle no longer refers to a live entity.
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// Placement outside the map.
    #[error("Cell ({x}, {y}) is outside the map")]
    OutOfBounds {
        /// Cell x coordinate.
        x: i32,
        /// Cell y coordinate.
        y: i32,
    },

    /// Invalid world state.
    #[error("Invalid world state: {0}")]
    InvalidState(String),

    /// Snapshot encoding failure.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}
