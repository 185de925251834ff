use std::{
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};

use encoding_rs::Encoding;
use thiserror::Error;
use tracing::debug;

use crate::args::ArgsError;

/// Where the SQL text comes from. Built once from the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySource {
    Inline(String),
    File(PathBuf),
    Stdin,
}

impl QuerySource {
    /// An inline query wins over a file, and a file means stdin is never read.
    pub fn select(
        query: Option<&str>,
        path: Option<&Path>,
        stdin_is_terminal: bool,
    ) -> Result<Self, ArgsError> {
        if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
            return Ok(QuerySource::Inline(query.to_string()));
        }
        match path {
            Some(path) if path == Path::new("-") => Ok(QuerySource::Stdin),
            Some(path) => Ok(QuerySource::File(path.to_path_buf())),
            None if stdin_is_terminal => Err(ArgsError::NoInput),
            None => Ok(QuerySource::Stdin),
        }
    }

    pub fn resolve(self, encoding: &str) -> Result<String, QueryError> {
        match self {
            QuerySource::Inline(query) => Ok(query),
            QuerySource::File(path) => {
                debug!(path = %path.display(), "reading query file");
                let file = File::open(&path).map_err(|source| QueryError::Open {
                    path: path.clone(),
                    source,
                })?;
                resolve_query(None, file, encoding)
            }
            QuerySource::Stdin => {
                debug!("reading query from stdin");
                resolve_query(None, io::stdin().lock(), encoding)
            }
        }
    }
}

/// Returns the trimmed inline query if there is one, otherwise all of `source` decoded.
/// `source` is not touched when the inline query is used.
pub fn resolve_query<R: Read>(
    inline: Option<&str>,
    mut source: R,
    encoding: &str,
) -> Result<String, QueryError> {
    if let Some(query) = inline.map(str::trim).filter(|q| !q.is_empty()) {
        return Ok(query.to_string());
    }
    let encoding = lookup_encoding(encoding)?;
    let mut bytes = Vec::new();
    source.read_to_end(&mut bytes)?;
    decode(&bytes, encoding)
}

fn lookup_encoding(label: &str) -> Result<&'static Encoding, QueryError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| QueryError::UnknownEncoding(label.to_string()))
}

fn decode(bytes: &[u8], encoding: &'static Encoding) -> Result<String, QueryError> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or_else(|| QueryError::Undecodable(encoding.name().to_string()))
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Unknown encoding: `{0}`")]
    UnknownEncoding(String),
    #[error("The query can not be decoded as {0}")]
    Undecodable(String),
    #[error("Can not open query file {}: `{source}`", .path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("IO Error: `{0}`")]
    IoError(#[from] io::Error),
}
