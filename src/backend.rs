//! The seams between the pipeline and a database driver.
//!
//! A [`Backend`] turns a connection string into an [`Engine`], the engine hands
//! out [`Connection`]s, a connection prepares a [`Statement`] and running the
//! statement yields either a row count or a forward only [`Cursor`].

use std::fmt::Display;

use crate::{
    error::{ConfigurationError, ExecutionError},
    options::{ExecutionOptions, Options},
};

/// A single scalar read from a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Display for Field {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Null => Ok(()),
            Field::Int(i) => i.fmt(formatter),
            // Debug keeps "10.0" and switches to "1e300" for large magnitudes.
            Field::Real(f) => write!(formatter, "{:?}", f),
            Field::Text(text) => text.fmt(formatter),
            Field::Blob(bytes) => String::from_utf8_lossy(bytes).fmt(formatter),
        }
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::Text(value.to_string())
    }
}

pub trait Backend {
    /// Dialect name as it appears before `://` in a connection string.
    fn name(&self) -> &'static str;
    fn create_engine(
        &self,
        url: &ConnectionUrl,
        options: &Options,
    ) -> Result<Box<dyn Engine>, ConfigurationError>;
}

pub trait Engine {
    fn connect(&self) -> Result<Box<dyn Connection + '_>, ExecutionError>;
    /// Releases whatever the engine still holds. Called once, after every connection is closed.
    fn dispose(&mut self) {}
}

pub trait Connection {
    fn apply_execution_options(&mut self, options: &ExecutionOptions)
    -> Result<(), ExecutionError>;
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement + '_>, ExecutionError>;
    fn close(&mut self) -> Result<(), ExecutionError> {
        Ok(())
    }
}

pub trait Statement {
    fn execute(&mut self) -> Result<Execution<'_>, ExecutionError>;
}

pub enum Execution<'s> {
    /// The statement produced no row set (DDL, DML without `RETURNING`).
    NoRows { affected: u64 },
    Rows(Box<dyn Cursor + 's>),
}

/// Forward only, single pass access to the rows of an executed statement.
pub trait Cursor {
    fn column_names(&self) -> &[String];
    /// Fetches the next row; `None` once the result is exhausted.
    fn next_row(&mut self) -> Result<Option<Vec<Field>>, ExecutionError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionUrl {
    pub dialect: String,
    pub driver: Option<String>,
    /// Everything after `://`, passed to the backend untouched.
    pub location: String,
}

impl TryFrom<&str> for ConnectionUrl {
    type Error = ConfigurationError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let Some((scheme, location)) = value.split_once("://") else {
            return Err(ConfigurationError::InvalidConnectionString(
                value.to_string(),
            ));
        };
        let (dialect, driver) = match scheme.split_once('+') {
            Some((dialect, driver)) => (dialect, Some(driver.to_string())),
            None => (scheme, None),
        };
        if dialect.is_empty() {
            return Err(ConfigurationError::InvalidConnectionString(
                value.to_string(),
            ));
        }
        Ok(Self {
            dialect: dialect.to_lowercase(),
            driver,
            location: location.to_string(),
        })
    }
}

const KNOWN_DIALECTS: &[(&str, &str)] = &[
    ("sqlite", "SQLite"),
    ("postgresql", "PostgreSQL"),
    ("postgres", "PostgreSQL"),
    ("mysql", "MySQL"),
    ("mariadb", "MariaDB"),
    ("mssql", "Microsoft SQL Server"),
    ("oracle", "Oracle"),
];

pub struct Backends {
    backends: Vec<Box<dyn Backend>>,
}

impl Default for Backends {
    fn default() -> Self {
        #[allow(unused_mut)]
        let mut backends = Self::empty();
        #[cfg(feature = "sqlite")]
        backends.register(Box::new(crate::sqlite::SqliteBackend));
        backends
    }
}

impl Backends {
    pub fn empty() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    pub fn register(&mut self, backend: Box<dyn Backend>) {
        self.backends.push(backend);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn create_engine(
        &self,
        connection_string: &str,
        options: &Options,
    ) -> Result<Box<dyn Engine>, ConfigurationError> {
        let url = ConnectionUrl::try_from(connection_string)?;
        match self.backends.iter().find(|b| b.name() == url.dialect) {
            Some(backend) => backend.create_engine(&url, options),
            None => Err(self.missing_backend(&url.dialect)),
        }
    }

    fn missing_backend(&self, dialect: &str) -> ConfigurationError {
        let Some((_, label)) = KNOWN_DIALECTS.iter().find(|(name, _)| *name == dialect) else {
            return ConfigurationError::UnknownDialect(dialect.to_string());
        };
        let available = if self.backends.is_empty() {
            "\t(none)".to_string()
        } else {
            self.names()
                .iter()
                .map(|name| format!("\t{}://", name))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let guidance = format!(
            "You don't appear to have the necessary database backend installed for connection \
             string you're trying to use. {} support is not part of this build.\n\n\
             Available backends include:\n\n{}\n\n\
             SQLite support comes from the `sqlite` cargo feature, which is on by default:\n\n\
             \tcargo install sql2csv --features sqlite",
            label, available
        );
        ConfigurationError::MissingBackend {
            dialect: dialect.to_string(),
            guidance,
        }
    }
}
