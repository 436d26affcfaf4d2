//! Error types for the combat simulation.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all combat simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(u64),

    /// A weapon id that is not present in the loaded catalog.
    #[error("Unknown weapon: {0}")]
    UnknownWeapon(String),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Configuration self-test found problems.
    #[error("Validation failed with {infractions} infraction(s) over {total_cases} case(s)")]
    ValidationFailed {
        /// Number of infractions reported.
        infractions: usize,
        /// Number of cases checked.
        total_cases: usize,
    },

    /// Snapshot or replay (de)serialization failure.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Replay playback diverged from the recorded session.
    #[error("Replay diverged at tick {tick}: expected hash {expected}, got {actual}")]
    ReplayDiverged {
        /// Final tick of the playback.
        tick: u64,
        /// Hash stored in the replay.
        expected: u64,
        /// Hash produced by playback.
        actual: u64,
    },
}
