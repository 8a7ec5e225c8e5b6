//! Backend protocol capabilities for trace-replay.
//!
//! Every backend implements [`Protocol`]: a one-time `prepare` step plus the
//! `get` and `put` operations a trace can ask for. Backends are looked up by
//! name in a [`ProtocolRegistry`], so adding one does not touch the code that
//! dispatches requests.
//!
//! # Backends
//!
//! - **rest**: plain HTTP(S) via `reqwest`
//! - **s3**: object storage via the AWS SDK; `prepare` creates the bucket
//! - **filesystem**, **ceph**: declared only, `get`/`put` are not implemented
//!
//! # Example
//!
//! ```ignore
//! use trace_replay_protocol::{ProtocolOptions, ProtocolRegistry};
//!
//! let registry = ProtocolRegistry::with_defaults();
//! let protocol = registry.create("rest", &ProtocolOptions::default())?;
//! protocol.prepare("http://localhost:8080").await?;
//! let timing = protocol.get("http://localhost:8080", "/index.html").await?;
//! println!("{} bytes, status {}", timing.bytes, timing.status);
//! ```

mod declared;
mod error;
mod registry;
mod rest;
mod s3;

use async_trait::async_trait;
use std::time::Duration;

pub use declared::{CephProtocol, FilesystemProtocol};
pub use error::ProtocolError;
pub use registry::{ProtocolFactory, ProtocolRegistry};
pub use rest::RestProtocol;
pub use s3::{parse_s3_base, S3Location, S3Protocol};

/// Timing and result of one completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTiming {
    /// Time until the response started arriving
    pub latency: Duration,
    /// Time spent reading the response body
    pub transfer: Duration,
    /// Body bytes received (GET) or sent (PUT)
    pub bytes: u64,
    /// Status code reported by the backend
    pub status: u16,
}

/// Options shared by all backends.
#[derive(Debug, Clone, Default)]
pub struct ProtocolOptions {
    /// Value for the `Host` header, overriding the one derived from the URL
    pub host_header: Option<String>,
}

/// A storage backend that trace requests are replayed against.
#[async_trait]
pub trait Protocol: Send + Sync {
    /// Registry name of this backend.
    fn name(&self) -> &'static str;

    /// One-time setup before any request is issued.
    async fn prepare(&self, _base: &str) -> Result<(), ProtocolError> {
        Ok(())
    }

    /// Fetch `path` below `base` and discard the body.
    async fn get(&self, base: &str, path: &str) -> Result<RequestTiming, ProtocolError>;

    /// Store `size` bytes of filler data at `path` below `base`.
    async fn put(&self, base: &str, path: &str, size: u64) -> Result<RequestTiming, ProtocolError>;
}

/// Join a base address and a trace path with exactly one `/` between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Largest upload body a PUT will allocate (1 GiB).
pub const MAX_PUT_SIZE: u64 = 1 << 30;

/// Filler payload for uploads.
pub(crate) fn filler(size: u64) -> Result<Vec<u8>, ProtocolError> {
    match usize::try_from(size) {
        Ok(len) if size <= MAX_PUT_SIZE => Ok(vec![b'x'; len]),
        _ => Err(ProtocolError::PayloadTooLarge {
            size,
            limit: MAX_PUT_SIZE,
        }),
    }
}
