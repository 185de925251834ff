use std::io::Error as IoError;
use thiserror::Error;

use crate::{args::ArgsError, query::QueryError, writer::WriterError};

#[derive(Error, Debug)]
pub enum Sql2CsvError {
    #[error("{0}")]
    ConfigurationError(#[from] ConfigurationError),
    #[error("{0}")]
    ExecutionError(#[from] ExecutionError),
    #[error("{0}")]
    QueryError(#[from] QueryError),
    #[error("Write error: `{0}`")]
    WriterError(#[from] WriterError),
    #[error("{0}")]
    ArgsError(#[from] ArgsError),
    #[error("IO Error: `{0}`")]
    IoError(#[from] IoError),
}

/// Problems with what the user asked for, found before any statement runs.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Invalid connection string: `{0}`")]
    InvalidConnectionString(String),
    #[error("Can't load plugin: sql2csv.dialects:{0}")]
    UnknownDialect(String),
    /// The guidance is shown to the user as is.
    #[error("{guidance}")]
    MissingBackend { dialect: String, guidance: String },
    #[error("Invalid argument `{0}` sent to the {1} engine")]
    UnknownEngineOption(String, String),
    #[error("Invalid value `{value}` for engine option `{key}`: expected {expected}")]
    InvalidEngineOption {
        key: String,
        value: String,
        expected: &'static str,
    },
    #[error("Invalid value `{value}` for execution option `{key}`")]
    InvalidExecutionOption { key: String, value: String },
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Database error: {0}")]
    Driver(#[from] Box<dyn std::error::Error + Send + Sync>),
    #[error("The statement expects {0} parameter(s) but none were supplied")]
    UnboundParameters(usize),
}
