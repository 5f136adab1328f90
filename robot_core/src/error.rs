// Typed errors with thiserror. Surface meaningful messages to JS.
// The animation core itself never fails; these cover the edges.

use thiserror::Error;

/// Robot core error types.
#[derive(Error, Debug)]
pub enum RobotError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown robot state: {0}")]
    UnknownState(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Product lookup failed: {0}")]
    ProductSource(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RobotError {
    fn from(err: serde_json::Error) -> Self {
        RobotError::Serialization(err.to_string())
    }
}
