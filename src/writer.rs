use std::io::{self, Write};

use csv::{QuoteStyle, Terminator, WriterBuilder};
use thiserror::Error;

use crate::backend::Field;

/// Receives the records of one result set, in order.
pub trait RecordWriter {
    fn write_header(&mut self, names: &[String]) -> Result<(), WriterError>;
    fn write_row(&mut self, row: &[Field]) -> Result<(), WriterError>;
    fn flush(&mut self) -> Result<(), WriterError>;
}

/// How records are laid out. The defaults match what spreadsheet tools expect.
#[derive(Debug, Clone)]
pub struct CsvDialect {
    pub delimiter: u8,
    pub quote: u8,
    pub quote_style: QuoteStyle,
    pub double_quote: bool,
    pub escape: u8,
    pub terminator: Terminator,
}

impl Default for CsvDialect {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            quote_style: QuoteStyle::Necessary,
            double_quote: true,
            escape: b'\\',
            terminator: Terminator::Any(b'\n'),
        }
    }
}

const LINE_NUMBER_HEADER: &str = "line_number";

struct CsvWriter<W: Write> {
    writer: csv::Writer<W>,
    line_numbers: bool,
    line: u64,
}

impl<W: Write> CsvWriter<W> {
    fn write_line_number(&mut self) -> Result<(), WriterError> {
        if self.line_numbers {
            self.line += 1;
            self.writer.write_field(self.line.to_string())?;
        }
        Ok(())
    }
}

impl<W: Write> RecordWriter for CsvWriter<W> {
    fn write_header(&mut self, names: &[String]) -> Result<(), WriterError> {
        if self.line_numbers {
            self.writer.write_field(LINE_NUMBER_HEADER)?;
        }
        self.writer.write_record(names)?;
        Ok(())
    }

    fn write_row(&mut self, row: &[Field]) -> Result<(), WriterError> {
        self.write_line_number()?;
        for field in row {
            match field {
                Field::Null => self.writer.write_field("")?,
                Field::Text(text) => self.writer.write_field(text)?,
                other => self.writer.write_field(other.to_string())?,
            }
        }
        self.writer.write_record(None::<&[u8]>)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), WriterError> {
        self.writer.flush()?;
        Ok(())
    }
}

pub fn new_csv_writer<W: Write>(
    w: W,
    dialect: &CsvDialect,
    line_numbers: bool,
) -> impl RecordWriter {
    CsvWriter {
        writer: WriterBuilder::new()
            .delimiter(dialect.delimiter)
            .quote(dialect.quote)
            .quote_style(dialect.quote_style)
            .double_quote(dialect.double_quote)
            .escape(dialect.escape)
            .terminator(dialect.terminator)
            .flexible(true)
            .from_writer(w),
        line_numbers,
        line: 0,
    }
}

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("IO Error: `{0}`")]
    IoError(#[from] io::Error),
    #[error("CSV Error: `{0}`")]
    CsvError(#[from] csv::Error),
}
