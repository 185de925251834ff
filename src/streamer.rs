use std::iter;

use tracing::debug;

use crate::{
    backend::{Connection, Cursor, Execution, Field},
    error::{ExecutionError, Sql2CsvError},
    options::ExecutionOptions,
    writer::RecordWriter,
};

/// Runs `sql` as a single raw statement and writes its rows to `sink` as they arrive.
///
/// Returns the number of data rows written; a statement without a row set writes
/// nothing and returns 0. The caller owns the connection and closes it afterwards,
/// whether this succeeds or not.
pub fn stream(
    connection: &mut dyn Connection,
    sql: &str,
    options: &ExecutionOptions,
    sink: &mut dyn RecordWriter,
    suppress_header: bool,
) -> Result<u64, Sql2CsvError> {
    connection.apply_execution_options(options)?;
    let mut statement = connection.prepare(sql)?;
    let mut cursor = match statement.execute()? {
        Execution::NoRows { affected } => {
            debug!(affected, "statement returned no rows");
            return Ok(0);
        }
        Execution::Rows(cursor) => cursor,
    };
    if !suppress_header {
        sink.write_header(cursor.column_names())?;
    }
    let mut count = 0;
    for row in rows(cursor.as_mut()) {
        sink.write_row(&row?)?;
        count += 1;
    }
    sink.flush()?;
    debug!(rows = count, "result set streamed");
    Ok(count)
}

/// The remaining rows of `cursor`, fetched one at a time as the iterator is advanced.
pub fn rows<C: Cursor + ?Sized>(
    cursor: &mut C,
) -> impl Iterator<Item = Result<Vec<Field>, ExecutionError>> + '_ {
    iter::from_fn(move || cursor.next_row().transpose())
}
