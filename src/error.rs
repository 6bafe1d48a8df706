// src/error.rs
// Store error types

use thiserror::Error;

/// Storage engine errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lock acquisition timed out for {0}")]
    LockTimeout(String),

    #[error("Corrupt journal line: {0}")]
    CorruptLine(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Event publish failed: {0}")]
    EventPublish(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
