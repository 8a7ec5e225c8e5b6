//! Error types for backend protocols.

use thiserror::Error;

/// Errors returned by protocol capabilities and the registry.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The selected backend does not implement this operation.
    #[error("{operation} is not implemented for protocol '{protocol}'")]
    NotImplemented {
        protocol: &'static str,
        operation: &'static str,
    },

    /// No backend is registered under this name.
    #[error("unknown protocol '{name}', expected one of: {known}")]
    UnknownProtocol { name: String, known: String },

    /// The base address cannot be used by this backend.
    #[error("invalid base address '{0}'")]
    InvalidBase(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// S3 error without an HTTP status to report.
    #[error("S3 error: {0}")]
    S3(String),

    /// Upload size above what a single filler body may hold.
    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },
}

impl ProtocolError {
    /// Whether the error comes from selecting an unimplemented operation
    /// rather than from talking to the backend.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, ProtocolError::NotImplemented { .. })
    }
}
