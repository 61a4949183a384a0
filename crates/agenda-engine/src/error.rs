//! Error types for agenda-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid RRULE: {0}")]
    InvalidRule(String),

    #[error("Timestamp out of range: {0}")]
    TimestampOutOfRange(i64),
}

pub type Result<T> = std::result::Result<T, EngineError>;
