//! OAuth2 client configuration types.
//!
//! Clients are owned by the gateway's plugin configuration and consumed here
//! read-only. The grant processor only ever looks at the fields below.

use serde::{Deserialize, Serialize};

use crate::secret::HashRule;

/// Default access token lifetime in seconds.
pub const DEFAULT_TOKEN_EXPIRATION: i64 = 7200;

/// Default refresh token lifetime in seconds (14 days).
pub const DEFAULT_REFRESH_TOKEN_TTL: i64 = 1_209_600;

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth2 grant types handled by the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Exchange a previously issued authorization code.
    AuthorizationCode,
    /// Machine-to-machine issuance from client credentials alone.
    ClientCredentials,
    /// Exchange a refresh token for a new access token.
    RefreshToken,
}

impl GrantType {
    /// Returns the `grant_type` parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// Parses a `grant_type` parameter value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(Self::AuthorizationCode),
            "client_credentials" => Some(Self::ClientCredentials),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Client
// =============================================================================

/// OAuth2 client as configured on the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Unique client identifier.
    pub client_id: String,

    /// Client secret. Plain text, or an encoded PBKDF2 rule when
    /// `hash_secret` is set (see [`HashRule::parse`]).
    #[serde(default)]
    pub client_secret: String,

    /// Allow the `authorization_code` grant.
    #[serde(default)]
    pub enable_authorization_code: bool,

    /// Allow the `client_credentials` grant.
    #[serde(default)]
    pub enable_client_credentials: bool,

    /// Access token lifetime in seconds. Non-positive means the default.
    #[serde(default)]
    pub token_expiration: i64,

    /// Refresh token lifetime in seconds. Non-positive means the default.
    #[serde(default)]
    pub refresh_token_ttl: i64,

    /// Keep handing out the same refresh token on every refresh.
    #[serde(default)]
    pub reuse_refresh_token: bool,

    /// Keep the previous access token valid after a refresh.
    #[serde(default)]
    pub persistent_refresh_token: bool,

    /// Whether `client_secret` holds a derived PBKDF2 value.
    #[serde(default)]
    pub hash_secret: bool,
}

impl Client {
    /// Creates a client with every grant disabled and default lifetimes.
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            enable_authorization_code: false,
            enable_client_credentials: false,
            token_expiration: 0,
            refresh_token_ttl: 0,
            reuse_refresh_token: false,
            persistent_refresh_token: false,
            hash_secret: false,
        }
    }

    /// Returns `true` if the client may use the given grant type.
    ///
    /// Refresh is always permitted, regardless of the per-grant flags.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        match grant_type {
            GrantType::AuthorizationCode => self.enable_authorization_code,
            GrantType::ClientCredentials => self.enable_client_credentials,
            GrantType::RefreshToken => true,
        }
    }

    /// Returns the hash rule used to verify presented secrets.
    ///
    /// For plain-text secrets the rule only carries the expected value.
    /// Returns `None` when `hash_secret` is set but the stored secret cannot
    /// be parsed as an encoded rule.
    #[must_use]
    pub fn hash_rule(&self) -> Option<HashRule> {
        if self.hash_secret {
            HashRule::parse(&self.client_secret)
        } else {
            Some(HashRule::plain(&self.client_secret))
        }
    }

    /// Access token lifetime with the default applied.
    #[must_use]
    pub fn effective_token_expiration(&self) -> i64 {
        if self.token_expiration <= 0 {
            DEFAULT_TOKEN_EXPIRATION
        } else {
            self.token_expiration
        }
    }

    /// Refresh token lifetime with the default applied.
    #[must_use]
    pub fn effective_refresh_token_ttl(&self) -> i64 {
        if self.refresh_token_ttl <= 0 {
            DEFAULT_REFRESH_TOKEN_TTL
        } else {
            self.refresh_token_ttl
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_type_round_trip_names() {
        for grant in [
            GrantType::AuthorizationCode,
            GrantType::ClientCredentials,
            GrantType::RefreshToken,
        ] {
            assert_eq!(GrantType::parse(grant.as_str()), Some(grant));
        }
        assert_eq!(GrantType::parse("password"), None);
        assert_eq!(GrantType::parse(""), None);
    }

    #[test]
    fn test_refresh_always_allowed() {
        let client = Client::new("abc", "s3cret");
        assert!(client.is_grant_type_allowed(GrantType::RefreshToken));
        assert!(!client.is_grant_type_allowed(GrantType::AuthorizationCode));
        assert!(!client.is_grant_type_allowed(GrantType::ClientCredentials));
    }

    #[test]
    fn test_effective_lifetimes() {
        let mut client = Client::new("abc", "s3cret");
        assert_eq!(client.effective_token_expiration(), 7200);
        assert_eq!(client.effective_refresh_token_ttl(), 1_209_600);

        client.token_expiration = 60;
        client.refresh_token_ttl = -5;
        assert_eq!(client.effective_token_expiration(), 60);
        assert_eq!(client.effective_refresh_token_ttl(), 1_209_600);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let client: Client = serde_json::from_str(
            r#"{"client_id":"abc","client_secret":"s3cret","enable_client_credentials":true}"#,
        )
        .unwrap();
        assert!(client.enable_client_credentials);
        assert!(!client.hash_secret);
        assert_eq!(client.token_expiration, 0);
        assert_eq!(client.hash_rule().unwrap().value, "s3cret");
    }
}
