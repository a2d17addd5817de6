//! Opaque token generation and credential record writes.
//!
//! Token values are 40 bytes from the OS random generator, base64 encoded and
//! digested with SHA-256 into 64 lowercase hex characters. Access and refresh
//! values are generated independently.
//!
//! # Consistency
//!
//! The access record is written before the refresh record. If the second
//! write fails the access record stays behind until its TTL elapses.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::OAuth2Result;
use crate::clock::Clock;
use crate::error::OAuth2Error;
use crate::storage::{KeyNamespace, TokenStore, fields};
use crate::types::{DEFAULT_REFRESH_TOKEN_TTL, DEFAULT_TOKEN_EXPIRATION, TOKEN_TYPE_BEARER, Token};

const RANDOM_BYTES: usize = 40;

/// Generates a fresh opaque token value.
#[must_use]
pub fn generate_token_value() -> String {
    let mut bytes = [0u8; RANDOM_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let encoded = STANDARD.encode(bytes);
    hex::encode(Sha256::digest(encoded.as_bytes()))
}

/// Mints tokens and writes their credential records.
#[derive(Clone)]
pub struct TokenFactory {
    namespace: KeyNamespace,
    clock: Arc<dyn Clock>,
}

impl TokenFactory {
    /// Creates a factory writing into `namespace`.
    pub fn new(namespace: KeyNamespace, clock: Arc<dyn Clock>) -> Self {
        Self { namespace, clock }
    }

    /// Returns the key namespace.
    #[must_use]
    pub fn namespace(&self) -> &KeyNamespace {
        &self.namespace
    }

    /// Mints an access token, and a refresh token if `mint_refresh` is set,
    /// and stores their credential records.
    ///
    /// Non-positive `token_expires_in` defaults to 7200 seconds and
    /// non-positive `refresh_ttl` to 1 209 600 seconds.
    ///
    /// # Errors
    ///
    /// Returns a storage error if either record write fails.
    pub async fn generate_token(
        &self,
        store: &dyn TokenStore,
        client_id: &str,
        token_expires_in: i64,
        refresh_ttl: i64,
        scope: &str,
        mint_refresh: bool,
    ) -> OAuth2Result<Token> {
        let token_expires_in = if token_expires_in <= 0 {
            DEFAULT_TOKEN_EXPIRATION
        } else {
            token_expires_in
        };
        let refresh_ttl = if refresh_ttl <= 0 {
            DEFAULT_REFRESH_TOKEN_TTL
        } else {
            refresh_ttl
        };

        let access_token = generate_token_value();
        let refresh_token = if mint_refresh {
            generate_token_value()
        } else {
            String::new()
        };

        let record = [
            (fields::CLIENT_ID, client_id.to_string()),
            (fields::EXPIRES_IN, token_expires_in.to_string()),
            (fields::ACCESS_TOKEN, access_token.clone()),
            (fields::REFRESH_TOKEN, refresh_token.clone()),
            (fields::CREATE_AT, self.clock.now_millis().to_string()),
            (fields::SCOPE, scope.to_string()),
        ];

        let access_key = self.namespace.access_key(&access_token);
        store
            .set_fields(&access_key, &record, Some(seconds(token_expires_in)))
            .await
            .map_err(|e| write_error(client_id, &access_key, &e))?;

        if mint_refresh {
            let refresh_key = self.namespace.refresh_key(&refresh_token);
            store
                .set_fields(&refresh_key, &record, Some(seconds(refresh_ttl)))
                .await
                .map_err(|e| write_error(client_id, &refresh_key, &e))?;
        }

        tracing::debug!(
            client_id = %client_id,
            expires_in = token_expires_in,
            with_refresh = mint_refresh,
            "Token minted"
        );

        Ok(Token {
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: token_expires_in,
            access_token,
            refresh_token,
            scope: scope.to_string(),
        })
    }
}

fn seconds(value: i64) -> Duration {
    Duration::from_secs(value.unsigned_abs())
}

fn write_error(client_id: &str, key: &str, err: &OAuth2Error) -> OAuth2Error {
    OAuth2Error::storage(format!("({client_id}) write {key} error: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::MemoryTokenStore;
    use async_trait::async_trait;

    const NOW_MS: i64 = 1_700_000_000_000;

    fn factory() -> TokenFactory {
        TokenFactory::new(
            KeyNamespace::new("test"),
            Arc::new(FixedClock::from_millis(NOW_MS)),
        )
    }

    #[test]
    fn test_token_value_shape() {
        let value = generate_token_value();
        assert_eq!(value.len(), 64);
        assert!(value.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(value, generate_token_value());
    }

    #[tokio::test]
    async fn test_access_only() {
        let store = MemoryTokenStore::new();
        let token = factory()
            .generate_token(&store, "abc", 0, 0, "", false)
            .await
            .unwrap();

        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.expires_in, 7200);
        assert!(token.refresh_token.is_empty());
        assert_eq!(store.len(), 1);

        let key = factory().namespace().access_key(&token.access_token);
        let values = store
            .get_fields(
                &key,
                &[fields::CLIENT_ID, fields::ACCESS_TOKEN, fields::CREATE_AT, fields::EXPIRES_IN],
            )
            .await
            .unwrap();
        assert_eq!(values[0], "abc");
        assert_eq!(values[1], token.access_token);
        assert_eq!(values[2], NOW_MS.to_string());
        assert_eq!(values[3], "7200");

        let ttl = store.ttl(&key).unwrap();
        assert!(ttl <= Duration::from_secs(7200) && ttl > Duration::from_secs(7100));
    }

    #[tokio::test]
    async fn test_with_refresh() {
        let store = MemoryTokenStore::new();
        let factory = factory();
        let token = factory
            .generate_token(&store, "abc", 60, 0, "read", true)
            .await
            .unwrap();

        assert_eq!(token.expires_in, 60);
        assert_eq!(token.scope, "read");
        assert_eq!(token.refresh_token.len(), 64);
        assert_ne!(token.refresh_token, token.access_token);

        let refresh_key = factory.namespace().refresh_key(&token.refresh_token);
        let values = store
            .get_fields(&refresh_key, &[fields::REFRESH_TOKEN, fields::ACCESS_TOKEN])
            .await
            .unwrap();
        assert_eq!(values, vec![token.refresh_token.clone(), token.access_token.clone()]);

        let ttl = store.ttl(&refresh_key).unwrap();
        assert!(ttl > Duration::from_secs(1_209_000));
    }

    /// Store that rejects refresh-namespace writes.
    struct RefreshWriteFails(MemoryTokenStore);

    #[async_trait]
    impl TokenStore for RefreshWriteFails {
        async fn set_fields(
            &self,
            key: &str,
            fields: &[(&str, String)],
            ttl: Option<Duration>,
        ) -> OAuth2Result<()> {
            if key.contains("oauth2_refresh_tokens") {
                return Err(OAuth2Error::storage("READONLY"));
            }
            self.0.set_fields(key, fields, ttl).await
        }

        async fn get_fields(&self, key: &str, names: &[&str]) -> OAuth2Result<Vec<String>> {
            self.0.get_fields(key, names).await
        }

        async fn delete(&self, key: &str) -> OAuth2Result<()> {
            self.0.delete(key).await
        }

        async fn scan_keys(&self, pattern: &str) -> OAuth2Result<Vec<String>> {
            self.0.scan_keys(pattern).await
        }
    }

    #[tokio::test]
    async fn test_second_write_failure_leaves_access_record() {
        let store = RefreshWriteFails(MemoryTokenStore::new());
        let err = factory()
            .generate_token(&store, "abc", 0, 0, "", true)
            .await
            .unwrap_err();

        assert!(matches!(err, OAuth2Error::Storage { .. }));
        assert!(err.to_string().contains("READONLY"));
        assert!(err.to_string().starts_with("(abc)"));
        assert_eq!(store.0.len(), 1);
    }
}
