//! Access token validation for the gateway's request pipeline.
//!
//! Validation is a pure read: one field lookup per request, no writes.

use std::sync::Arc;

use crate::OAuth2Result;
use crate::clock::Clock;
use crate::error::OAuth2Error;
use crate::storage::{CacheRegistry, KeyNamespace, fields};

const VALIDATION_FIELDS: [&str; 4] = [
    fields::CLIENT_ID,
    fields::ACCESS_TOKEN,
    fields::CREATE_AT,
    fields::EXPIRES_IN,
];

/// Resolves presented access tokens to client identities.
#[derive(Clone)]
pub struct TokenValidator {
    caches: CacheRegistry,
    namespace: KeyNamespace,
    clock: Arc<dyn Clock>,
}

impl TokenValidator {
    /// Creates a validator reading from the primary cache.
    pub fn new(caches: CacheRegistry, namespace: KeyNamespace, clock: Arc<dyn Clock>) -> Self {
        Self {
            caches,
            namespace,
            clock,
        }
    }

    /// Validates `token` and returns the owning client id.
    ///
    /// # Errors
    ///
    /// - `Validation` if `token` is empty
    /// - `Configuration` if no cache backend is registered
    /// - `NotFound` if no access record exists for the token
    /// - `Expired` if `create_at + expires_in` lies in the past
    /// - `Mismatch` if the record's `access_token` differs from `token`
    /// - `Storage` if the backend read fails
    pub async fn validate(&self, token: &str) -> OAuth2Result<String> {
        if token.is_empty() {
            return Err(OAuth2Error::validation("access token is required"));
        }

        let store = self.caches.primary()?;
        let key = self.namespace.access_key(token);
        let mut values = store.get_fields(&key, &VALIDATION_FIELDS).await?;
        let expires_in = values.pop().unwrap_or_default();
        let create_at = values.pop().unwrap_or_default();
        let access_token = values.pop().unwrap_or_default();
        let client_id = values.pop().unwrap_or_default();

        if access_token.is_empty() && client_id.is_empty() {
            tracing::debug!("Access token not found");
            return Err(OAuth2Error::not_found("token not found"));
        }

        let create_at: i64 = create_at.parse().unwrap_or(0);
        let expires_in: i64 = expires_in.parse().unwrap_or(0);
        let expiry = create_at.saturating_add(expires_in.saturating_mul(1000));
        if self.clock.now_millis() > expiry {
            tracing::debug!(client_id = %client_id, "Access token expired");
            return Err(OAuth2Error::Expired);
        }

        if access_token != token {
            tracing::warn!(client_id = %client_id, "Access record does not match its key");
            return Err(OAuth2Error::Mismatch);
        }

        Ok(client_id)
    }
}
