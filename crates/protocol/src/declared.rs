//! Backends that are declared but not wired for requests yet.

use crate::{Protocol, ProtocolError, RequestTiming};
use async_trait::async_trait;

/// Local filesystem backend. Selecting it for GET or PUT is an error.
#[derive(Debug, Default)]
pub struct FilesystemProtocol;

/// Ceph distributed-storage backend. Selecting it for GET or PUT is an error.
#[derive(Debug, Default)]
pub struct CephProtocol;

macro_rules! not_wired {
    ($backend:ty, $name:literal) => {
        #[async_trait]
        impl Protocol for $backend {
            fn name(&self) -> &'static str {
                $name
            }

            async fn get(&self, _base: &str, _path: &str) -> Result<RequestTiming, ProtocolError> {
                Err(ProtocolError::NotImplemented {
                    protocol: $name,
                    operation: "GET",
                })
            }

            async fn put(
                &self,
                _base: &str,
                _path: &str,
                _size: u64,
            ) -> Result<RequestTiming, ProtocolError> {
                Err(ProtocolError::NotImplemented {
                    protocol: $name,
                    operation: "PUT",
                })
            }
        }
    };
}

not_wired!(FilesystemProtocol, "filesystem");
not_wired!(CephProtocol, "ceph");
