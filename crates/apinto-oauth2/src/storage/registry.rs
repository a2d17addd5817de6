//! Ordered set of configured cache backends.
//!
//! The registry is built once at startup and handed to every component that
//! needs storage. The first registered backend is the one in use; an empty
//! registry surfaces as a configuration error at request time so the process
//! can still start and serve diagnostics.

use std::sync::Arc;

use super::TokenStore;
use crate::OAuth2Result;
use crate::error::OAuth2Error;

/// A named cache backend.
#[derive(Clone)]
pub struct NamedStore {
    /// Configured instance name.
    pub name: String,
    /// The backend.
    pub store: Arc<dyn TokenStore>,
}

/// Ordered registry of cache backends.
#[derive(Clone, Default)]
pub struct CacheRegistry {
    stores: Vec<NamedStore>,
}

impl CacheRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding a single backend.
    #[must_use]
    pub fn single(name: impl Into<String>, store: Arc<dyn TokenStore>) -> Self {
        Self::new().with_store(name, store)
    }

    /// Appends a backend.
    #[must_use]
    pub fn with_store(mut self, name: impl Into<String>, store: Arc<dyn TokenStore>) -> Self {
        self.stores.push(NamedStore {
            name: name.into(),
            store,
        });
        self
    }

    /// Returns the backend in use: the first one registered.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no backend is registered.
    pub fn primary(&self) -> OAuth2Result<Arc<dyn TokenStore>> {
        self.stores
            .first()
            .map(|named| Arc::clone(&named.store))
            .ok_or_else(|| OAuth2Error::configuration("redis cache is not found"))
    }

    /// Names of the registered backends, in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.stores.iter().map(|s| s.name.as_str()).collect()
    }

    /// Number of registered backends.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Returns `true` if no backend is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}
