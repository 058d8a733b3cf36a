use std::path::PathBuf;
use thiserror::Error;

/// Which extract an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Mp,
    Crm,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Mp => write!(f, "MP"),
            Side::Crm => write!(f, "CRM"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("{side} input not found: {}", path.display())]
    InputNotFound { side: Side, path: PathBuf },

    #[error("{key} does not exist in {side}")]
    MissingKey { side: Side, key: String },

    #[error("Cannot parse {value:?} in column {column} as a number")]
    NumericParse { column: String, value: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::prelude::PolarsError> for AuditError {
    fn from(e: polars::prelude::PolarsError) -> Self {
        AuditError::Polars(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
