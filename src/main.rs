use clap::Parser;
use sql2csv::{
    args::Args,
    backend::Backends,
    error::Sql2CsvError,
    logging::init_logging,
    pipeline::{Request, run},
};
use std::io::{self, IsTerminal};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match execute(&args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn execute(args: &Args) -> Result<u64, Sql2CsvError> {
    let request = Request::from_args(args, io::stdin().is_terminal())?;
    let stdout = io::stdout().lock();
    run(request, &Backends::default(), stdout)
}
