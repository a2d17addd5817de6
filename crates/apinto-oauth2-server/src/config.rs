use std::collections::HashSet;
use std::net::SocketAddr;

use apinto_oauth2::{Client, KeyNamespace};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Key namespace (cluster scoping)
    #[serde(default)]
    pub namespace: NamespaceConfig,
    /// Cache backends, in order of preference
    #[serde(default)]
    pub caches: Vec<CacheConfig>,
    /// OAuth2 clients allowed to use the token endpoint
    #[serde(default)]
    pub clients: Vec<Client>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }

        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }

        for (index, cache) in self.caches.iter().enumerate() {
            if cache.name.is_empty() {
                return Err(format!("caches[{index}].name must not be empty"));
            }
            if cache.kind == CacheKind::Redis {
                if cache.url.is_empty() {
                    return Err(format!("caches[{index}] ({}) requires url", cache.name));
                }
                if cache.pool_size == 0 {
                    return Err(format!("caches[{index}].pool_size must be > 0"));
                }
                if cache.timeout_ms == 0 {
                    return Err(format!("caches[{index}].timeout_ms must be > 0"));
                }
            }
        }

        let mut seen = HashSet::new();
        for client in &self.clients {
            if client.client_id.is_empty() {
                return Err("clients[].client_id must not be empty".into());
            }
            if !seen.insert(client.client_id.as_str()) {
                return Err(format!("duplicate client_id: {}", client.client_id));
            }
            if client.hash_secret && client.hash_rule().is_none() {
                return Err(format!(
                    "client {} has hash_secret=true but client_secret is not a \
                     $pbkdf2-sha512$i=..,l=..$salt$value string",
                    client.client_id
                ));
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8099
}
fn default_body_limit() -> usize {
    4 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NamespaceConfig {
    /// Cluster identifier embedded in every key. When empty, the `cluster_id`
    /// environment variable is used.
    #[serde(default)]
    pub cluster_id: String,
}

impl NamespaceConfig {
    pub fn key_namespace(&self) -> KeyNamespace {
        if self.cluster_id.is_empty() {
            KeyNamespace::from_env()
        } else {
            KeyNamespace::new(self.cluster_id.clone())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    #[default]
    Redis,
    Memory,
}

/// One cache backend instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub name: String,

    #[serde(default)]
    pub kind: CacheKind,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Per-call timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    2000
}

impl CacheConfig {
    pub fn memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CacheKind::Memory,
            url: String::new(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_PATH: &str = "apinto-oauth2.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., APINTO_OAUTH2__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("APINTO_OAUTH2")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(id: &str) -> Client {
        Client::new(id, "s3cret")
    }

    #[test]
    fn test_default_is_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.caches.is_empty());
        assert_eq!(cfg.addr().port(), 8099);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.clients = vec![client("abc"), client("abc")];
        assert!(cfg.validate().unwrap_err().contains("duplicate"));

        let mut cfg = AppConfig::default();
        let mut hashed = client("abc");
        hashed.hash_secret = true;
        cfg.clients = vec![hashed];
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        let mut redis = CacheConfig::memory("r");
        redis.kind = CacheKind::Redis;
        cfg.caches = vec![redis];
        assert!(cfg.validate().unwrap_err().contains("requires url"));
    }

    #[test]
    fn test_explicit_cluster_wins() {
        let namespace = NamespaceConfig {
            cluster_id: "east".into(),
        };
        assert_eq!(namespace.key_namespace().cluster(), "east");
    }
}
