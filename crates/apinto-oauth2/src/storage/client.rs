//! Client lookup.
//!
//! Clients are configured externally and consumed read-only. The token
//! endpoint resolves the `client_id` parameter through a [`ClientRegistry`].

use std::collections::HashMap;

use async_trait::async_trait;

use crate::OAuth2Result;
use crate::types::Client;

/// Read-only lookup of configured clients.
///
/// # Example
///
/// ```ignore
/// use apinto_oauth2::storage::ClientRegistry;
///
/// async fn example(registry: &impl ClientRegistry) {
///     if let Some(client) = registry.find_by_client_id("abc").await? {
///         println!("grant flags: {}", client.enable_client_credentials);
///     }
/// }
/// ```
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Find a client by its `client_id`.
    ///
    /// Returns `None` if no such client is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails.
    async fn find_by_client_id(&self, client_id: &str) -> OAuth2Result<Option<Client>>;
}

/// Client registry backed by a fixed list, typically from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticClientRegistry {
    clients: HashMap<String, Client>,
}

impl StaticClientRegistry {
    /// Builds a registry from `clients`. A later duplicate `client_id`
    /// replaces an earlier one.
    #[must_use]
    pub fn new(clients: impl IntoIterator<Item = Client>) -> Self {
        let clients = clients
            .into_iter()
            .map(|client| (client.client_id.clone(), client))
            .collect();
        Self { clients }
    }

    /// Number of configured clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if no client is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[async_trait]
impl ClientRegistry for StaticClientRegistry {
    async fn find_by_client_id(&self, client_id: &str) -> OAuth2Result<Option<Client>> {
        Ok(self.clients.get(client_id).cloned())
    }
}
