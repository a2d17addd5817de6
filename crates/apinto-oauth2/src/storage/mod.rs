//! Credential storage over a TTL-capable hash-map cache.
//!
//! All persistence goes through the [`TokenStore`] trait. Records are hash
//! maps of string fields stored under namespaced keys built by
//! [`KeyNamespace`]:
//!
//! ```text
//! apinto:oauth2_access_tokens:<cluster>:<access token>
//! apinto:oauth2_refresh_tokens:<cluster>:<refresh token>
//! apinto:oauth2_codes:<cluster>:<authorization code>
//! ```
//!
//! # Consistency
//!
//! No operation is transactional across keys. Callers that touch several
//! keys (issuing a pair, redeeming a code, rotating a refresh token) get
//! at-least-once, not exactly-once, semantics under concurrent requests.
//!
//! # Implementations
//!
//! - [`MemoryTokenStore`] - in-process store for single-instance deployments
//! - `apinto-oauth2-redis` - Redis backend shared by every gateway instance
//!
//! Client configurations are looked up separately through [`ClientRegistry`].

pub mod client;
pub mod memory;
pub mod registry;

use std::time::Duration;

use async_trait::async_trait;

use crate::OAuth2Result;

pub use client::{ClientRegistry, StaticClientRegistry};
pub use memory::MemoryTokenStore;
pub use registry::CacheRegistry;

/// Field names of a credential record.
pub mod fields {
    /// Access token value; must equal the access key's suffix.
    pub const ACCESS_TOKEN: &str = "access_token";
    /// Refresh token value, empty if none was minted.
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Granted scope.
    pub const SCOPE: &str = "scope";
    /// Access token lifetime in seconds.
    pub const EXPIRES_IN: &str = "expires_in";
    /// Creation time in epoch milliseconds.
    pub const CREATE_AT: &str = "create_at";
    /// Owning client.
    pub const CLIENT_ID: &str = "client_id";
    /// Authorization code value.
    pub const CODE: &str = "code";
}

/// Storage trait for credential records.
///
/// Dropping a returned future abandons the in-flight backend call;
/// implementations are expected to bound every call with a backend timeout.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Writes all given fields under `key`.
    ///
    /// With `Some(ttl)` the whole key expires after `ttl`. With `None` any
    /// existing expiry on the key is left untouched.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend rejects the write.
    async fn set_fields(
        &self,
        key: &str,
        fields: &[(&str, String)],
        ttl: Option<Duration>,
    ) -> OAuth2Result<()>;

    /// Reads the named fields of `key`, in order.
    ///
    /// Absent fields (and every field of an absent key) come back empty.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend read fails.
    async fn get_fields(&self, key: &str, names: &[&str]) -> OAuth2Result<Vec<String>>;

    /// Deletes `key`. Deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend delete fails.
    async fn delete(&self, key: &str) -> OAuth2Result<()>;

    /// Enumerates keys matching a glob pattern (`*` and `?`).
    ///
    /// # Errors
    ///
    /// Returns a storage error if enumeration fails.
    async fn scan_keys(&self, pattern: &str) -> OAuth2Result<Vec<String>>;
}

// =============================================================================
// Key Namespace
// =============================================================================

const KEY_ROOT: &str = "apinto";

/// Record categories, each with its own key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCategory {
    /// Access-token credential records.
    AccessTokens,
    /// Refresh-token credential records.
    RefreshTokens,
    /// Authorization code records.
    Codes,
}

impl KeyCategory {
    /// Returns the category segment used in keys.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessTokens => "oauth2_access_tokens",
            Self::RefreshTokens => "oauth2_refresh_tokens",
            Self::Codes => "oauth2_codes",
        }
    }
}

/// Builds keys scoped to a category and a gateway cluster.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyNamespace {
    cluster: String,
}

impl KeyNamespace {
    /// Environment variable holding the cluster identifier.
    pub const CLUSTER_ENV: &'static str = "cluster_id";

    /// Creates a namespace for the given cluster.
    #[must_use]
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }

    /// Creates a namespace from the `cluster_id` environment variable.
    ///
    /// An unset variable yields an empty cluster segment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(std::env::var(Self::CLUSTER_ENV).unwrap_or_default())
    }

    /// Returns the cluster identifier.
    #[must_use]
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Builds the key for `value` in `category`.
    #[must_use]
    pub fn key(&self, category: KeyCategory, value: &str) -> String {
        format!(
            "{KEY_ROOT}:{}:{}:{value}",
            category.as_str(),
            self.cluster
        )
    }

    /// Key of an access-token record.
    #[must_use]
    pub fn access_key(&self, token: &str) -> String {
        self.key(KeyCategory::AccessTokens, token)
    }

    /// Key of a refresh-token record.
    #[must_use]
    pub fn refresh_key(&self, token: &str) -> String {
        self.key(KeyCategory::RefreshTokens, token)
    }

    /// Key of an authorization code record.
    #[must_use]
    pub fn code_key(&self, code: &str) -> String {
        self.key(KeyCategory::Codes, code)
    }

    /// Glob pattern matching every key in `category`.
    #[must_use]
    pub fn pattern(&self, category: KeyCategory) -> String {
        self.key(category, "*")
    }
}
