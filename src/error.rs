use thiserror::Error;

/// Result type for allocator operations
pub type Result<T> = std::result::Result<T, QosError>;

/// Errors surfaced by the allocator.
///
/// Per-tick operations never fail; these only come out of construction,
/// configuration and persistence.
#[derive(Debug, Error)]
pub enum QosError {
    /// A telemetry snapshot carried an unusable value
    #[error("Invalid network state field '{field}': {reason}")]
    InvalidState {
        field: String,
        reason: String,
    },

    /// Invalid configuration value
    #[error("Invalid config parameter '{name}': {reason}")]
    InvalidConfig {
        name: String,
        reason: String,
    },

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary snapshot could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON configuration could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// Helper functions for common error patterns
impl QosError {
    pub fn invalid_state<S: Into<String>, R: Into<String>>(field: S, reason: R) -> Self {
        QosError::InvalidState {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config<S: Into<String>, R: Into<String>>(name: S, reason: R) -> Self {
        QosError::InvalidConfig {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
