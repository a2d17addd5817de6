//! Token endpoint request and response types.

use std::collections::HashMap;

use serde::Serialize;

/// Token type reported in every successful response.
pub const TOKEN_TYPE_BEARER: &str = "bearer";

/// An issued credential pair as returned to the caller.
///
/// Empty `access_token`, `refresh_token` and `scope` values are omitted from
/// the serialized response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Always `"bearer"`.
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: i64,

    /// Opaque access token.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub access_token: String,

    /// Opaque refresh token, empty when none was minted.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub refresh_token: String,

    /// Scope recovered from the grant.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scope: String,
}

/// Successful token endpoint response: the token plus the echoed `state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrantResponse {
    /// The issued token.
    #[serde(flatten)]
    pub token: Token,

    /// Caller-supplied opaque state, echoed verbatim.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state: String,
}

/// Normalized token endpoint parameters.
///
/// Absent parameters are represented as empty strings, matching how the
/// grant state machine treats them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenRequest {
    /// Requested grant type.
    pub grant_type: String,
    /// Client identifier used to look up the client configuration.
    pub client_id: String,
    /// Presented client secret.
    pub client_secret: String,
    /// Opaque state echoed in the response.
    pub state: String,
    /// Refresh token (refresh_token grant).
    pub refresh_token: String,
    /// Authorization code (authorization_code grant).
    pub code: String,
}

impl TokenRequest {
    /// Builds a request from a normalized parameter map.
    #[must_use]
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let get = |name: &str| params.get(name).cloned().unwrap_or_default();
        Self {
            grant_type: get("grant_type"),
            client_id: get("client_id"),
            client_secret: get("client_secret"),
            state: get("state"),
            refresh_token: get("refresh_token"),
            code: get("code"),
        }
    }
}
