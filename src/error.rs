use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed record at {}:{line}: {reason} (line: {content:?})", path.display())]
    MalformedRecord {
        path: PathBuf,
        line: u64,
        content: String,
        reason: String,
    },
    #[error("cannot open {}: {source}", path.display())]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("render failed: {0}")]
    Render(String),
}

impl Error {
    /// Line number of the offending record, if this is a parse failure.
    pub fn line(&self) -> Option<u64> {
        match self {
            Error::MalformedRecord { line, .. } => Some(*line),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
