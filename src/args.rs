use std::path::PathBuf;

use clap::{ArgAction, Parser};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Execute a SQL query on a database and output the result to a CSV file.",
    long_about = None
)]
pub struct Args {
    /// A connection string to connect to a database, for example sqlite:///data.db.
    #[arg(long = "db", env = "SQL2CSV_DB", default_value = "sqlite://")]
    pub connection_string: String,

    /// An engine option, as a space-separated pair. Can be repeated. For example: timeout 10
    #[arg(long, num_args = 2, value_names = ["KEY", "VALUE"], action = ArgAction::Append)]
    pub engine_option: Vec<String>,

    /// An execution option, as a space-separated pair. Can be repeated. For example: stream_results True
    #[arg(long, num_args = 2, value_names = ["KEY", "VALUE"], action = ArgAction::Append)]
    pub execution_option: Vec<String>,

    /// The file to use as SQL query. If FILE and --query are omitted, the query is piped data via STDIN.
    #[arg(value_name = "FILE")]
    pub input_path: Option<PathBuf>,

    /// The SQL query to execute. Overrides FILE and STDIN.
    #[arg(long)]
    pub query: Option<String>,

    /// Specify the encoding of the input query file.
    #[arg(short, long, default_value = "utf-8")]
    pub encoding: String,

    /// Do not output column names.
    #[arg(short = 'H', long, default_value_t = false)]
    pub no_header_row: bool,

    /// Insert a column of line numbers at the front of the output.
    #[arg(short = 'l', long = "linenumbers", default_value_t = false)]
    pub line_numbers: bool,

    /// Log what is happening to stderr.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    pub fn engine_options(&self) -> impl Iterator<Item = (&str, &str)> {
        pairs(&self.engine_option)
    }

    pub fn execution_options(&self) -> impl Iterator<Item = (&str, &str)> {
        pairs(&self.execution_option)
    }
}

fn pairs(values: &[String]) -> impl Iterator<Item = (&str, &str)> {
    values
        .chunks_exact(2)
        .map(|pair| (pair[0].as_str(), pair[1].as_str()))
}

#[derive(Error, Debug)]
pub enum ArgsError {
    #[error("You must provide an input file or piped data.")]
    NoInput,
}
