pub mod args;
pub mod backend;
pub mod connection_manager;
pub mod error;
pub mod logging;
pub mod options;
pub mod pipeline;
pub mod query;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod streamer;
pub mod value;
pub mod writer;

#[cfg(test)]
mod fake;
