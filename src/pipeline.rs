use std::io::Write;

use tracing::debug;

use crate::{
    args::{Args, ArgsError},
    backend::Backends,
    connection_manager::{ConnectionManager, ConnectionSpec},
    error::Sql2CsvError,
    options::{ExecutionOptions, ExecutionSpec, coerce},
    query::QuerySource,
    streamer::stream,
    writer::{CsvDialect, new_csv_writer},
};

/// Everything one run needs, gathered before any I/O happens.
#[derive(Debug, Clone)]
pub struct Request {
    pub connection: ConnectionSpec,
    pub execution: ExecutionSpec,
    pub query: QuerySource,
    pub encoding: String,
    pub no_header_row: bool,
    pub line_numbers: bool,
    pub dialect: CsvDialect,
}

impl Request {
    pub fn new(connection_string: &str, query: QuerySource) -> Self {
        Self {
            connection: ConnectionSpec {
                connection_string: connection_string.to_string(),
                engine_options: Default::default(),
            },
            execution: ExecutionSpec::default(),
            query,
            encoding: "utf-8".to_string(),
            no_header_row: false,
            line_numbers: false,
            dialect: CsvDialect::default(),
        }
    }

    pub fn from_args(args: &Args, stdin_is_terminal: bool) -> Result<Self, ArgsError> {
        let query = QuerySource::select(
            args.query.as_deref(),
            args.input_path.as_deref(),
            stdin_is_terminal,
        )?;
        Ok(Self {
            connection: ConnectionSpec {
                connection_string: args.connection_string.clone(),
                engine_options: coerce(args.engine_options()),
            },
            execution: ExecutionSpec::with_pairs(args.execution_options()),
            query,
            encoding: args.encoding.clone(),
            no_header_row: args.no_header_row,
            line_numbers: args.line_numbers,
            dialect: CsvDialect::default(),
        })
    }
}

/// Resolves the query, opens the database, and streams the result to `output` as CSV.
///
/// The connection is closed and the engine disposed before this returns, on
/// success and on failure alike.
pub fn run<W: Write>(
    request: Request,
    backends: &Backends,
    output: W,
) -> Result<u64, Sql2CsvError> {
    let sql = request.query.resolve(&request.encoding)?;
    let options = ExecutionOptions::try_from(&request.execution.options)?;
    let manager = ConnectionManager::open(&request.connection, backends)?;
    let mut session = manager.connect()?;
    let mut writer = new_csv_writer(output, &request.dialect, request.line_numbers);
    let count = stream(
        &mut *session,
        &sql,
        &options,
        &mut writer,
        request.no_header_row,
    )?;
    debug!(rows = count, "done");
    Ok(count)
}
