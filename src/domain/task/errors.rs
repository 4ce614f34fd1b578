//! Task Context - Errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("Unknown on-chain task status code: {0}")]
    UnknownStatus(u8),

    #[error("Task prompt cannot be empty")]
    EmptyPrompt,

    #[error("Invalid decision: {0}")]
    InvalidDecision(String),
}
