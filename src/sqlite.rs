//! SQLite backend on top of rusqlite.

use std::{path::PathBuf, time::Duration};

use rusqlite::{OpenFlags, Rows, types::ValueRef};
use tracing::{debug, info};

use crate::{
    backend::{
        Backend, Connection, ConnectionUrl, Cursor, Engine, Execution, Field, Statement,
    },
    error::{ConfigurationError, ExecutionError},
    options::{ExecutionOptions, Options},
    value::Value,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
// sqlite3_busy_timeout takes an int of milliseconds.
const MAX_TIMEOUT_MILLIS: u128 = i32::MAX as u128;
const TIMEOUT_EXPECTED: &str = "a non-negative number of seconds up to 2147483";

impl From<rusqlite::Error> for ExecutionError {
    fn from(err: rusqlite::Error) -> Self {
        ExecutionError::Driver(Box::new(err))
    }
}

impl From<ValueRef<'_>> for Field {
    fn from(value_ref: ValueRef<'_>) -> Self {
        match value_ref {
            ValueRef::Null => Field::Null,
            ValueRef::Integer(i) => Field::Int(i),
            ValueRef::Real(r) => Field::Real(r),
            ValueRef::Text(t) => Field::Text(String::from_utf8_lossy(t).to_string()),
            ValueRef::Blob(b) => Field::Blob(b.to_vec()),
        }
    }
}

pub struct SqliteBackend;

impl Backend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn create_engine(
        &self,
        url: &ConnectionUrl,
        options: &Options,
    ) -> Result<Box<dyn Engine>, ConfigurationError> {
        let target = SqliteTarget::try_from(url)?;
        let mut timeout = DEFAULT_TIMEOUT;
        let mut read_only = false;
        let mut echo = false;
        for (key, value) in options {
            match key.as_str() {
                "timeout" => {
                    timeout = value
                        .as_float()
                        .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
                        .filter(|timeout| timeout.as_millis() <= MAX_TIMEOUT_MILLIS)
                        .ok_or_else(|| invalid_option(key, value, TIMEOUT_EXPECTED))?;
                }
                "read_only" => {
                    read_only = value
                        .as_bool()
                        .ok_or_else(|| invalid_option(key, value, "a boolean"))?;
                }
                "echo" => {
                    echo = value
                        .as_bool()
                        .ok_or_else(|| invalid_option(key, value, "a boolean"))?;
                }
                _ => {
                    return Err(ConfigurationError::UnknownEngineOption(
                        key.clone(),
                        self.name().to_string(),
                    ));
                }
            }
        }
        let flags = if read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        };
        debug!(?target, driver = ?url.driver, ?timeout, read_only, "created sqlite engine");
        Ok(Box::new(SqliteEngine {
            target,
            flags,
            timeout,
            echo,
        }))
    }
}

fn invalid_option(key: &str, value: &Value, expected: &'static str) -> ConfigurationError {
    ConfigurationError::InvalidEngineOption {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SqliteTarget {
    Memory,
    File(PathBuf),
}

impl TryFrom<&ConnectionUrl> for SqliteTarget {
    type Error = ConfigurationError;
    fn try_from(url: &ConnectionUrl) -> Result<Self, Self::Error> {
        if url.location.is_empty() {
            return Ok(SqliteTarget::Memory);
        }
        // sqlite:///relative.db and sqlite:////absolute.db
        let Some(path) = url.location.strip_prefix('/') else {
            return Err(ConfigurationError::InvalidConnectionString(format!(
                "sqlite://{}: expected sqlite:///<path>",
                url.location
            )));
        };
        if path.is_empty() || path == ":memory:" {
            Ok(SqliteTarget::Memory)
        } else {
            Ok(SqliteTarget::File(PathBuf::from(path)))
        }
    }
}

struct SqliteEngine {
    target: SqliteTarget,
    flags: OpenFlags,
    timeout: Duration,
    echo: bool,
}

impl Engine for SqliteEngine {
    fn connect(&self) -> Result<Box<dyn Connection + '_>, ExecutionError> {
        let conn = match &self.target {
            SqliteTarget::Memory => rusqlite::Connection::open_in_memory_with_flags(self.flags)?,
            SqliteTarget::File(path) => rusqlite::Connection::open_with_flags(path, self.flags)?,
        };
        conn.busy_timeout(self.timeout)?;
        Ok(Box::new(SqliteConnection {
            conn: Some(conn),
            options: ExecutionOptions::default(),
            echo: self.echo,
        }))
    }
}

struct SqliteConnection {
    conn: Option<rusqlite::Connection>,
    options: ExecutionOptions,
    echo: bool,
}

impl Connection for SqliteConnection {
    fn apply_execution_options(
        &mut self,
        options: &ExecutionOptions,
    ) -> Result<(), ExecutionError> {
        // SQLite hands rows out one step at a time whatever stream_results says.
        if !options.stream_results {
            debug!("sqlite always streams rows; stream_results=false has no effect");
        }
        if let Some(size) = options.yield_per {
            debug!(size, "sqlite fetches one row per step; yield_per ignored");
        }
        for key in options.extra.keys() {
            debug!(option = %key, "execution option not used by sqlite");
        }
        self.options = options.clone();
        Ok(())
    }

    fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement + '_>, ExecutionError> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| ExecutionError::Driver("connection is closed".into()))?;
        if self.echo {
            info!("{}", sql);
        }
        let stmt = conn.prepare(sql)?;
        Ok(Box::new(SqliteStatement {
            stmt,
            no_parameters: self.options.no_parameters,
        }))
    }

    fn close(&mut self) -> Result<(), ExecutionError> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, err)| err)?;
        }
        Ok(())
    }
}

struct SqliteStatement<'c> {
    stmt: rusqlite::Statement<'c>,
    no_parameters: bool,
}

impl Statement for SqliteStatement<'_> {
    fn execute(&mut self) -> Result<Execution<'_>, ExecutionError> {
        let parameters = self.stmt.parameter_count();
        if parameters > 0 && !self.no_parameters {
            return Err(ExecutionError::UnboundParameters(parameters));
        }
        if self.stmt.column_count() == 0 {
            let affected = self.stmt.raw_execute()?;
            return Ok(Execution::NoRows {
                affected: affected as u64,
            });
        }
        let columns = self
            .stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let rows = self.stmt.raw_query();
        Ok(Execution::Rows(Box::new(SqliteCursor { columns, rows })))
    }
}

struct SqliteCursor<'s> {
    columns: Vec<String>,
    rows: Rows<'s>,
}

impl Cursor for SqliteCursor<'_> {
    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<Field>>, ExecutionError> {
        let Some(row) = self.rows.next()? else {
            return Ok(None);
        };
        let mut fields = Vec::with_capacity(self.columns.len());
        for index in 0..self.columns.len() {
            fields.push(Field::from(row.get_ref(index)?));
        }
        Ok(Some(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::coerce;

    fn engine(connection_string: &str, options: &Options) -> Box<dyn Engine> {
        let url = ConnectionUrl::try_from(connection_string).unwrap();
        SqliteBackend.create_engine(&url, options).ok().unwrap()
    }

    fn target(location: &str) -> Result<SqliteTarget, ConfigurationError> {
        let url = ConnectionUrl::try_from(format!("sqlite://{}", location).as_str())?;
        SqliteTarget::try_from(&url)
    }

    #[test]
    fn targets_follow_url_slashes() -> Result<(), ConfigurationError> {
        assert_eq!(target("")?, SqliteTarget::Memory);
        assert_eq!(target("/:memory:")?, SqliteTarget::Memory);
        assert_eq!(target("/data.db")?, SqliteTarget::File("data.db".into()));
        assert_eq!(target("//tmp/data.db")?, SqliteTarget::File("/tmp/data.db".into()));
        assert!(target("data.db").is_err());
        Ok(())
    }

    #[test]
    fn unknown_engine_option_is_rejected() {
        let url = ConnectionUrl::try_from("sqlite://").unwrap();
        let options = coerce([("thick_mode", "True")]);

        let err = SqliteBackend.create_engine(&url, &options).err().unwrap();

        assert!(
            matches!(err, ConfigurationError::UnknownEngineOption(ref key, _) if key == "thick_mode")
        );
    }

    #[test]
    fn engine_option_with_wrong_type_is_rejected() {
        let url = ConnectionUrl::try_from("sqlite://").unwrap();
        let options = coerce([("timeout", "soon")]);

        let err = SqliteBackend.create_engine(&url, &options).err().unwrap();

        assert!(matches!(err, ConfigurationError::InvalidEngineOption { .. }));
    }

    #[test]
    fn timeout_out_of_range_is_rejected() {
        let url = ConnectionUrl::try_from("sqlite://").unwrap();
        for timeout in ["1e300", "10000000000", "-1", "2147484"] {
            let options = coerce([("timeout", timeout)]);

            let err = SqliteBackend.create_engine(&url, &options).err().unwrap();

            assert!(
                matches!(err, ConfigurationError::InvalidEngineOption { ref key, .. } if key == "timeout"),
                "{}",
                timeout
            );
        }
    }

    #[test]
    fn largest_timeout_still_connects() -> Result<(), ExecutionError> {
        let engine = engine("sqlite://", &coerce([("timeout", "2147483")]));

        let mut conn = engine.connect()?;

        assert!(conn.prepare("SELECT 1").is_ok());
        Ok(())
    }

    #[test]
    fn select_streams_rows() -> Result<(), ExecutionError> {
        let engine = engine("sqlite://", &coerce([("timeout", "1.5"), ("echo", "true")]));
        let mut conn = engine.connect()?;
        conn.apply_execution_options(&ExecutionOptions::default())?;
        let mut stmt = conn.prepare("SELECT 1 AS id, 'a' AS name, NULL AS nothing, 2.0 AS ratio")?;

        let Execution::Rows(mut cursor) = stmt.execute()? else {
            panic!("expected rows");
        };

        assert_eq!(cursor.column_names(), ["id", "name", "nothing", "ratio"]);
        assert_eq!(
            cursor.next_row()?,
            Some(vec![
                Field::Int(1),
                Field::Text("a".into()),
                Field::Null,
                Field::Real(2.0)
            ])
        );
        assert_eq!(cursor.next_row()?, None);
        Ok(())
    }

    #[test]
    fn ddl_returns_no_rows() -> Result<(), ExecutionError> {
        let engine = engine("sqlite://", &Options::new());
        let mut conn = engine.connect()?;
        {
            let mut stmt = conn.prepare("CREATE TABLE t (id INTEGER)")?;
            let execution = stmt.execute()?;
            assert!(matches!(execution, Execution::NoRows { .. }));
        }
        let mut stmt = conn.prepare("INSERT INTO t VALUES (1), (2)")?;
        let Execution::NoRows { affected } = stmt.execute()? else {
            panic!("expected no rows");
        };
        assert_eq!(affected, 2);
        Ok(())
    }

    #[test]
    fn placeholders_run_raw_when_parameters_are_disabled() -> Result<(), ExecutionError> {
        let engine = engine("sqlite://", &Options::new());
        let mut conn = engine.connect()?;
        conn.apply_execution_options(&ExecutionOptions::default())?;
        let mut stmt = conn.prepare("SELECT ? AS q")?;

        let Execution::Rows(mut cursor) = stmt.execute()? else {
            panic!("expected rows");
        };

        assert_eq!(cursor.next_row()?, Some(vec![Field::Null]));
        Ok(())
    }

    #[test]
    fn placeholders_fail_when_parameters_are_expected() -> Result<(), ExecutionError> {
        let engine = engine("sqlite://", &Options::new());
        let mut conn = engine.connect()?;
        conn.apply_execution_options(&ExecutionOptions {
            no_parameters: false,
            ..Default::default()
        })?;
        let mut stmt = conn.prepare("SELECT ? AS q")?;

        let err = stmt.execute().err().unwrap();

        assert!(matches!(err, ExecutionError::UnboundParameters(1)));
        Ok(())
    }

    #[test]
    fn malformed_sql_is_an_execution_error() -> Result<(), ExecutionError> {
        let engine = engine("sqlite://", &Options::new());
        let mut conn = engine.connect()?;

        let err = conn.prepare("SELEKT 1").err().unwrap();

        assert!(matches!(err, ExecutionError::Driver(_)));
        Ok(())
    }

    #[test]
    fn closed_connection_refuses_statements() -> Result<(), ExecutionError> {
        let engine = engine("sqlite://", &Options::new());
        let mut conn = engine.connect()?;
        conn.close()?;
        conn.close()?;

        assert!(conn.prepare("SELECT 1").is_err());
        Ok(())
    }
}
