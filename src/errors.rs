use std::error::Error;

use crate::terminal::CommandResult;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TermErrorType {
    CommandNotFound,
    UsageError,
    AlreadyExists,
    NotFound,
    MissingTarget,
    IOError,
    InternalError,
}

#[derive(Debug)]
pub struct TermError {
    pub error_type: TermErrorType,
    pub message: String,
}

impl TermError {
    pub fn new(error_type: TermErrorType, message: String) -> Self {
        Self {
            error_type,
            message,
        }
    }
}

impl std::fmt::Display for TermError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.error_type, self.message)
    }
}

// Every error surfaces to the terminal as a failed result with one
// human-readable line. Nothing here is fatal to the session.
impl From<TermError> for CommandResult {
    fn from(error: TermError) -> Self {
        CommandResult::failure(error.message)
    }
}

impl From<std::io::Error> for TermError {
    fn from(error: std::io::Error) -> Self {
        Self {
            error_type: TermErrorType::IOError,
            message: error.to_string(),
        }
    }
}

impl From<sled::Error> for TermError {
    fn from(error: sled::Error) -> Self {
        Self {
            error_type: TermErrorType::IOError,
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for TermError {
    fn from(error: serde_json::Error) -> Self {
        Self {
            error_type: TermErrorType::InternalError,
            message: error.to_string(),
        }
    }
}

impl Error for TermError {}

pub type Result<T> = std::result::Result<T, TermError>;
