//! Bulk import and export of access token records.
//!
//! Used to migrate tokens issued by another system into the store and to list
//! what is currently stored. Only access token records take part; refresh and
//! code records are never exported.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::OAuth2Result;
use crate::clock::Clock;
use crate::error::OAuth2Error;
use crate::storage::{CacheRegistry, KeyCategory, KeyNamespace, fields};

const EXPORT_FIELDS: [&str; 6] = [
    fields::ACCESS_TOKEN,
    fields::SCOPE,
    fields::EXPIRES_IN,
    fields::CREATE_AT,
    fields::REFRESH_TOKEN,
    fields::CLIENT_ID,
];

// =============================================================================
// Wire Types
// =============================================================================

/// A loosely typed JSON value as produced by external token exporters.
///
/// Fields such as `scope` or `refresh_token` arrive as strings, numbers or
/// `null` depending on the producer; they are stored as strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    /// Absent or `null`.
    #[default]
    Absent,
    /// A JSON string.
    Text(String),
    /// A JSON number.
    Number(serde_json::Number),
}

impl LooseValue {
    /// Normalizes the value to its stored string form.
    #[must_use]
    pub fn to_field_value(&self) -> String {
        match self {
            Self::Absent => String::new(),
            Self::Text(text) => text.clone(),
            Self::Number(number) => number.to_string(),
        }
    }

    fn from_field(value: String) -> Self {
        Self::Text(value)
    }
}

/// Credential reference of an imported token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenCredential {
    /// Client the token was issued to.
    #[serde(default)]
    pub id: String,
}

/// One token record of an import/export batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenData {
    #[serde(default)]
    pub authenticated_userid: LooseValue,
    #[serde(default)]
    pub credential: TokenCredential,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub service: LooseValue,
    /// Creation time in epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub refresh_token: LooseValue,
    #[serde(default)]
    pub scope: LooseValue,
    #[serde(default)]
    pub ttl: i64,
    #[serde(default)]
    pub token_type: String,
    /// Lifetime in seconds, counted from `created_at`.
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub client_id: String,
}

impl TokenData {
    /// Client to record for an imported token: the credential id, falling
    /// back to the top-level `client_id`.
    fn owner(&self) -> &str {
        if self.credential.id.is_empty() {
            &self.client_id
        } else {
            &self.credential.id
        }
    }

    fn expiry_millis(&self) -> i64 {
        self.created_at
            .saturating_add(self.expires_in.saturating_mul(1000))
    }
}

/// Import payload and export response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenBatch {
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub data: Vec<TokenData>,
}

impl TokenBatch {
    /// Parses an import payload.
    ///
    /// # Errors
    ///
    /// Returns a serialization error for malformed JSON.
    pub fn from_slice(body: &[u8]) -> OAuth2Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }
}

// =============================================================================
// Import / Export
// =============================================================================

/// Imports and lists access token records.
#[derive(Clone)]
pub struct BulkTokens {
    caches: CacheRegistry,
    namespace: KeyNamespace,
    clock: Arc<dyn Clock>,
}

impl BulkTokens {
    pub fn new(caches: CacheRegistry, namespace: KeyNamespace, clock: Arc<dyn Clock>) -> Self {
        Self {
            caches,
            namespace,
            clock,
        }
    }

    /// Returns the cache registry.
    #[must_use]
    pub fn caches(&self) -> &CacheRegistry {
        &self.caches
    }

    /// Stores every unexpired record of `batch` and returns how many were
    /// written.
    ///
    /// Records whose `created_at + expires_in` lies in the past, with a
    /// non-positive `expires_in`, or without an access token are skipped.
    /// The stored TTL is the record's full `expires_in` counted from now, not
    /// the remainder of its original lifetime.
    ///
    /// # Errors
    ///
    /// - `Configuration` if no cache backend is registered
    /// - `Storage` on the first failed write; earlier records stay written
    pub async fn import(&self, batch: &TokenBatch) -> OAuth2Result<usize> {
        let store = self.caches.primary()?;
        let now = self.clock.now_millis();
        let mut imported = 0;

        for token in &batch.data {
            if token.access_token.is_empty() || token.expires_in <= 0 {
                debug!("Skipping token record without access token or lifetime");
                continue;
            }
            if token.expiry_millis() < now {
                debug!(client_id = %token.owner(), "Skipping expired token record");
                continue;
            }

            let key = self.namespace.access_key(&token.access_token);
            let record = [
                (fields::ACCESS_TOKEN, token.access_token.clone()),
                (fields::SCOPE, token.scope.to_field_value()),
                (fields::EXPIRES_IN, token.expires_in.to_string()),
                (fields::CREATE_AT, token.created_at.to_string()),
                (fields::REFRESH_TOKEN, token.refresh_token.to_field_value()),
                (fields::CLIENT_ID, token.owner().to_string()),
            ];
            store
                .set_fields(
                    &key,
                    &record,
                    Some(Duration::from_secs(token.expires_in.unsigned_abs())),
                )
                .await
                .map_err(|e| OAuth2Error::storage(format!("write {key} error: {e}")))?;
            imported += 1;
        }

        info!(
            received = batch.data.len(),
            imported,
            "Token records imported"
        );
        Ok(imported)
    }

    /// Lists every stored access token record.
    ///
    /// Records that cannot be read back or whose numeric fields do not parse
    /// are logged and left out.
    ///
    /// # Errors
    ///
    /// - `Configuration` if no cache backend is registered
    /// - `Storage` if key enumeration fails
    pub async fn export(&self) -> OAuth2Result<TokenBatch> {
        let store = self.caches.primary()?;
        let mut keys = store
            .scan_keys(&self.namespace.pattern(KeyCategory::AccessTokens))
            .await?;
        keys.sort();

        let mut data = Vec::with_capacity(keys.len());
        for key in keys {
            let values = match store.get_fields(&key, &EXPORT_FIELDS).await {
                Ok(values) => values,
                Err(e) => {
                    warn!(key = %key, error = %e, "get token error");
                    continue;
                }
            };
            match record_to_token(values) {
                Ok(token) => data.push(token),
                Err(e) => warn!(key = %key, error = %e, "get token error"),
            }
        }

        Ok(TokenBatch {
            total: data.len(),
            data,
        })
    }
}

fn record_to_token(values: Vec<String>) -> OAuth2Result<TokenData> {
    let mut values = values.into_iter();
    let mut next = || values.next().unwrap_or_default();
    let access_token = next();
    let scope = next();
    let expires_in = next();
    let created_at = next();
    let refresh_token = next();
    let client_id = next();

    let expires_in = expires_in
        .parse()
        .map_err(|_| OAuth2Error::serialization(format!("invalid expires_in: {expires_in:?}")))?;
    let created_at = created_at
        .parse()
        .map_err(|_| OAuth2Error::serialization(format!("invalid create_at: {created_at:?}")))?;

    Ok(TokenData {
        credential: TokenCredential {
            id: client_id.clone(),
        },
        access_token,
        created_at,
        refresh_token: LooseValue::from_field(refresh_token),
        scope: LooseValue::from_field(scope),
        expires_in,
        client_id,
        ..TokenData::default()
    })
}
