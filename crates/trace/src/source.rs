//! Trace input sources.

use crate::TraceError;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, BufReader};

/// Default buffer size for reading traces (1MB)
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Where a trace is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceSource {
    /// Standard input, selected with `-`
    Stdin,
    /// Local file; in tailing mode appended data is picked up as it arrives
    File(PathBuf),
}

impl TraceSource {
    /// Parse a command-line argument into a source.
    pub fn parse(arg: &str) -> Self {
        if arg == "-" {
            TraceSource::Stdin
        } else {
            TraceSource::File(PathBuf::from(arg))
        }
    }

    /// Open the source as a buffered async reader.
    pub async fn open(&self) -> Result<Box<dyn AsyncBufRead + Send + Unpin>, TraceError> {
        match self {
            TraceSource::Stdin => Ok(Box::new(BufReader::with_capacity(
                DEFAULT_BUFFER_SIZE,
                tokio::io::stdin(),
            ))),
            TraceSource::File(path) => {
                let file = tokio::fs::File::open(path).await?;
                tracing::debug!("Opened trace file: {}", path.display());
                Ok(Box::new(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file)))
            }
        }
    }

    /// Get a display name for logging
    pub fn display_name(&self) -> String {
        match self {
            TraceSource::Stdin => "<stdin>".to_string(),
            TraceSource::File(path) => path.display().to_string(),
        }
    }
}
