use std::io;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,sql2csv=info";
const VERBOSE_FILTER: &str = "info,sql2csv=debug";

/// Sends log events to stderr so they never mix with the CSV on stdout.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` picks between the two defaults.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
