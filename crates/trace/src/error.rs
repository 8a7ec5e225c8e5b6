//! Error types for trace reading.

use thiserror::Error;

/// Errors raised while reading or validating a trace.
#[derive(Error, Debug)]
pub enum TraceError {
    /// IO error on the underlying source.
    #[error("IO error reading trace: {0}")]
    Io(#[from] std::io::Error),

    /// A line could not be decoded.
    #[error("line {line}: trace line is not valid UTF-8")]
    Parse { line: u64 },

    /// A line does not have exactly nine fields.
    #[error("line {line}: number of fields != 9 in {fields:?}")]
    FieldCount { line: u64, fields: Vec<String> },

    /// The operator column holds something other than GET or PUT.
    #[error("line {line}: operation '{operator}' is not implemented, only GET and PUT are")]
    UnsupportedOperator { line: u64, operator: String },
}
