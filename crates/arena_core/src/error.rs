//! Error types for the encounter engine.
//!
//! Only load-time problems surface as errors. Runtime anomalies (bad damage
//! values, unknown ids, missing collaborators) are absorbed where they occur.

use thiserror::Error;

/// Result type alias using [`EncounterError`].
pub type Result<T> = std::result::Result<T, EncounterError>;

/// Top-level error type for the encounter engine.
#[derive(Debug, Error)]
pub enum EncounterError {
    /// Balance data could not be parsed.
    #[error("Failed to parse balance data '{source_name}': {message}")]
    ConfigParse {
        /// Where the data came from (file path or "<inline>").
        source_name: String,
        /// Parser message.
        message: String,
    },

    /// Balance data parsed but holds values the engine cannot run with.
    #[error("Invalid balance value for {field}: {reason}")]
    InvalidConfig {
        /// Dotted path to the offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The referenced combatant is not part of the session.
    #[error("Combatant not found: {0}")]
    CombatantNotFound(u32),

    /// Spawn request was malformed.
    #[error("Invalid spawn request: {0}")]
    InvalidSpawn(String),
}
