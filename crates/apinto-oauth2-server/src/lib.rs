pub mod config;
pub mod observability;
pub mod server;

use std::sync::Arc;

use apinto_oauth2::{CacheRegistry, MemoryTokenStore};
use apinto_oauth2_redis::{RedisStoreConfig, RedisTokenStore};

pub use config::{AppConfig, CacheConfig, CacheKind, LoggingConfig, NamespaceConfig, ServerConfig};
pub use observability::init_tracing;
pub use server::{AppState, OAuth2Server, ServerBuilder, build_app};

/// Build the cache registry from the configured instances.
///
/// Instances keep their configured order, so the first one that connects
/// becomes the primary store. A Redis instance that cannot be reached at
/// startup is skipped with a warning. When nothing connects, the registry is
/// empty and credential operations fail with a configuration error.
pub async fn create_cache_registry(caches: &[CacheConfig]) -> CacheRegistry {
    let mut registry = CacheRegistry::new();

    for cache in caches {
        match cache.kind {
            CacheKind::Memory => {
                tracing::info!(name = %cache.name, "Using in-memory token store");
                registry = registry.with_store(cache.name.clone(), Arc::new(MemoryTokenStore::new()));
            }
            CacheKind::Redis => {
                let store_config = RedisStoreConfig {
                    url: cache.url.clone(),
                    pool_size: cache.pool_size,
                    timeout_ms: cache.timeout_ms,
                };
                match RedisTokenStore::connect(&store_config).await {
                    Ok(store) => {
                        tracing::info!(name = %cache.name, "✓ Connected to Redis successfully");
                        registry = registry.with_store(cache.name.clone(), Arc::new(store));
                    }
                    Err(e) => {
                        tracing::warn!(
                            name = %cache.name,
                            url = %cache.url,
                            error = %e,
                            "Failed to connect to Redis. Skipping cache instance."
                        );
                    }
                }
            }
        }
    }

    if registry.is_empty() {
        tracing::warn!("No cache backend available; token requests will be rejected");
    } else {
        tracing::info!(caches = ?registry.names(), "Cache registry ready");
    }
    registry
}
