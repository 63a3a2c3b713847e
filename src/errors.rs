// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::types::{ExpressionId, UnitId};

#[derive(Error, Debug)]
pub enum CalcError {
    /// Decomposition could not reduce the text to a single value.
    #[error("Malformed expression: {0}")]
    MalformedExpression(String),

    /// Rejected by the submission validator before planning.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A result or failure was reported for a unit that is not in progress.
    #[error("Conflict: unit {unit} is {status}, expected in progress")]
    Conflict { unit: UnitId, status: String },

    /// Arithmetic failed while evaluating a unit (e.g. division by zero).
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// The backing store could not complete the operation; safe to retry.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    #[error("Expression not found: {0}")]
    ExpressionNotFound(ExpressionId),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CalcError {
    /// Whether the caller may simply retry the same operation later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CalcError::StoreUnavailable(_))
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        CalcError::MalformedExpression(msg.into())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CalcError>;
