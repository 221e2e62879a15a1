use thiserror::Error;
use std::io;

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("table '{0}' not found")]
    TableNotFound(String),
    #[error("column '{0}' not found")]
    ColumnNotFound(String),
    #[error("column reference '{0}' is ambiguous")]
    AmbiguousColumn(String),
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("unsupported statement: {0}")]
    Unsupported(String),
    #[error("no query definition found for '{0}'")]
    QueryNotFound(String),
    #[error("join integrity violation: {0}")]
    IntegrityViolation(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

pub type EtlResult<T> = Result<T, EtlError>;
