use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("identity value must be a string or an integer, got {0}")]
    InvalidIdentity(String),
}
