//! Name-based registry of protocol backends.

use crate::{
    CephProtocol, FilesystemProtocol, Protocol, ProtocolError, ProtocolOptions, RestProtocol,
    S3Protocol,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a backend from the shared options.
pub type ProtocolFactory =
    Box<dyn Fn(&ProtocolOptions) -> Result<Arc<dyn Protocol>, ProtocolError> + Send + Sync>;

/// Maps protocol names to backend factories.
pub struct ProtocolRegistry {
    factories: BTreeMap<String, ProtocolFactory>,
}

impl ProtocolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry with the built-in backends: `rest`, `s3`, `filesystem`, `ceph`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("rest", |options| Ok(Arc::new(RestProtocol::new(options)?)));
        registry.register("s3", |_| Ok(Arc::new(S3Protocol::new())));
        registry.register("filesystem", |_| Ok(Arc::new(FilesystemProtocol)));
        registry.register("ceph", |_| Ok(Arc::new(CephProtocol)));
        registry
    }

    /// Register (or replace) a backend under `name`.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&ProtocolOptions) -> Result<Arc<dyn Protocol>, ProtocolError> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build the backend registered under `name`.
    pub fn create(
        &self,
        name: &str,
        options: &ProtocolOptions,
    ) -> Result<Arc<dyn Protocol>, ProtocolError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ProtocolError::UnknownProtocol {
                name: name.to_string(),
                known: self.names().join(", "),
            })?;
        factory(options)
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
