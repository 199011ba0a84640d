//! Error types for otp-relay.

/// Top-level error type for the relay.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse tenant configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Record-store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Extraction-pipeline errors.
///
/// These are the failures that stay isolated per message: the orchestrator
/// catches them and records an `error` outcome for that message only, never
/// failing the batch as a whole.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Object fetch failed for {key}: {reason}")]
    Fetch { key: String, reason: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for the relay.
pub type Result<T> = std::result::Result<T, Error>;
