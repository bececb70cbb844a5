//! Error types for the colony world model.
//!
//! Boundary and logic violations are returned to the immediate caller, which is
//! expected to abort the triggering action rather than the session. Path costs,
//! production and connectivity never produce errors.

use thiserror::Error;

/// Errors raised by grid and structure operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// Coordinate outside the grid or its depth range
    #[error("Tile coordinates out of bounds: {{{x}, {y}, {depth}}}")]
    OutOfBounds { x: i32, y: i32, depth: i32 },

    /// Operation not valid in the current world state
    #[error("Logic error: {0}")]
    Logic(String),

    /// Height source does not cover the map
    #[error("Height source is {actual_width}x{actual_height}, map needs {width}x{height}")]
    DimensionMismatch {
        width: i32,
        height: i32,
        actual_width: u32,
        actual_height: u32,
    },
}

impl WorldError {
    /// Creates a new logic error.
    #[must_use]
    pub fn logic<S: Into<String>>(msg: S) -> Self {
        Self::Logic(msg.into())
    }
}

/// Result type alias for world operations.
pub type Result<T> = std::result::Result<T, WorldError>;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while saving or loading snapshots.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot does not fit this world: {0}")]
    World(#[from] WorldError),
}
