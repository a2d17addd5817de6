//! Grant processing for the token endpoint.
//!
//! [`GrantProcessor`] turns an authorization code, a refresh token or bare
//! client credentials into an issued [`Token`]. Every request runs the same
//! three steps:
//!
//! 1. Check the grant type is enabled for the client (refresh always is)
//! 2. Verify the presented client secret, before touching storage
//! 3. Dispatch to the grant branch
//!
//! # Concurrency
//!
//! Code redemption (read, delete, mint) and refresh rotation (read, mint,
//! delete) are separate store calls with no compare-and-delete between them.
//! Two concurrent requests presenting the same code or refresh token can both
//! pass the equality check before either delete lands, and both will be
//! issued tokens. Consumption is at-least-once, not exactly-once.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::OAuth2Result;
use crate::clock::Clock;
use crate::error::OAuth2Error;
use crate::secret::verify_client_secret;
use crate::storage::{CacheRegistry, KeyNamespace, TokenStore, fields};
use crate::token::TokenFactory;
use crate::types::{Client, GrantResponse, GrantType, Token, TokenRequest};

/// Dispatches token requests by grant type.
#[derive(Clone)]
pub struct GrantProcessor {
    caches: CacheRegistry,
    factory: TokenFactory,
}

impl GrantProcessor {
    /// Creates a processor writing into `namespace` on the primary cache.
    pub fn new(caches: CacheRegistry, namespace: KeyNamespace, clock: Arc<dyn Clock>) -> Self {
        Self {
            caches,
            factory: TokenFactory::new(namespace, clock),
        }
    }

    fn namespace(&self) -> &KeyNamespace {
        self.factory.namespace()
    }

    /// Processes a token request for an already resolved client.
    ///
    /// # Errors
    ///
    /// - `Validation` for a disabled/unknown grant type, a wrong secret, or a
    ///   missing `code`/`refresh_token` parameter
    /// - `Configuration` if no cache backend is registered
    /// - `NotFound` for an unknown, mismatched or consumed code/refresh token
    /// - `Storage` if the backend fails
    pub async fn process(
        &self,
        client: &Client,
        request: &TokenRequest,
    ) -> OAuth2Result<GrantResponse> {
        let grant_type = GrantType::parse(&request.grant_type)
            .filter(|grant| client.is_grant_type_allowed(*grant))
            .ok_or_else(|| {
                OAuth2Error::validation(format!(
                    "unsupported grant type: {}, client id is {}",
                    request.grant_type, client.client_id
                ))
            })?;

        if !verify_client_secret(&request.client_secret, client) {
            return Err(OAuth2Error::validation(format!(
                "fail to match secret, client id is {}",
                client.client_id
            )));
        }

        let store = self.caches.primary()?;
        let token = match grant_type {
            GrantType::RefreshToken => self.refresh(store.as_ref(), client, request).await?,
            GrantType::AuthorizationCode => {
                self.exchange_code(store.as_ref(), client, request).await?
            }
            GrantType::ClientCredentials => {
                self.client_credentials(store.as_ref(), client).await?
            }
        };

        info!(
            client_id = %client.client_id,
            grant_type = %grant_type,
            with_refresh = !token.refresh_token.is_empty(),
            "Token issued"
        );

        Ok(GrantResponse {
            token,
            state: request.state.clone(),
        })
    }

    /// `refresh_token` grant.
    async fn refresh(
        &self,
        store: &dyn TokenStore,
        client: &Client,
        request: &TokenRequest,
    ) -> OAuth2Result<Token> {
        let presented = request.refresh_token.as_str();
        if presented.is_empty() {
            return Err(OAuth2Error::validation(format!(
                "refresh token is required, client id is {}",
                client.client_id
            )));
        }

        let refresh_key = self.namespace().refresh_key(presented);
        let values = store
            .get_fields(
                &refresh_key,
                &[fields::REFRESH_TOKEN, fields::ACCESS_TOKEN, fields::SCOPE],
            )
            .await
            .map_err(|e| {
                warn!(client_id = %client.client_id, error = %e, "Refresh token lookup failed");
                OAuth2Error::storage(format!(
                    "fail to get refresh token, client id is {}",
                    client.client_id
                ))
            })?;
        let mut values = values.into_iter();
        let stored_refresh = values.next().unwrap_or_default();
        let stored_access = values.next().unwrap_or_default();
        let scope = values.next().unwrap_or_default();

        if stored_refresh.is_empty() || stored_access.is_empty() || stored_refresh != presented {
            return Err(OAuth2Error::not_found(format!(
                "invalid refresh token, client id is {}",
                client.client_id
            )));
        }

        let mut token = self
            .factory
            .generate_token(
                store,
                &client.client_id,
                client.token_expiration,
                client.refresh_token_ttl,
                &scope,
                !client.reuse_refresh_token,
            )
            .await
            .map_err(generate_error)?;

        if !client.persistent_refresh_token {
            let old_access_key = self.namespace().access_key(&stored_access);
            if let Err(e) = store.delete(&old_access_key).await {
                warn!(
                    client_id = %client.client_id,
                    error = %e,
                    "Failed to delete previous access token"
                );
            }
        }

        if client.reuse_refresh_token {
            // Point the surviving refresh record at the new access token so the
            // next refresh cleans up the right record. TTL is left as is.
            token.refresh_token = presented.to_string();
            let patch = [(fields::ACCESS_TOKEN, token.access_token.clone())];
            if let Err(e) = store.set_fields(&refresh_key, &patch, None).await {
                warn!(
                    client_id = %client.client_id,
                    error = %e,
                    "Failed to update reused refresh token"
                );
            }
        } else if let Err(e) = store.delete(&refresh_key).await {
            warn!(
                client_id = %client.client_id,
                error = %e,
                "Failed to delete rotated refresh token"
            );
        }

        debug!(
            client_id = %client.client_id,
            reused = client.reuse_refresh_token,
            persistent = client.persistent_refresh_token,
            "Refresh token exchanged"
        );
        Ok(token)
    }

    /// `authorization_code` grant.
    async fn exchange_code(
        &self,
        store: &dyn TokenStore,
        client: &Client,
        request: &TokenRequest,
    ) -> OAuth2Result<Token> {
        let presented = request.code.as_str();
        if presented.is_empty() {
            return Err(OAuth2Error::validation(format!(
                "code is required, client id is {}",
                client.client_id
            )));
        }

        let code_key = self.namespace().code_key(presented);
        let values = store
            .get_fields(&code_key, &[fields::CODE, fields::SCOPE])
            .await
            .map_err(|e| {
                warn!(client_id = %client.client_id, error = %e, "Authorization code lookup failed");
                OAuth2Error::storage(format!(
                    "fail to get code, client id is {}",
                    client.client_id
                ))
            })?;

        // Single use: the code is gone before its payload is trusted.
        if let Err(e) = store.delete(&code_key).await {
            warn!(client_id = %client.client_id, error = %e, "Failed to delete authorization code");
        }

        let mut values = values.into_iter();
        let stored_code = values.next().unwrap_or_default();
        let scope = values.next().unwrap_or_default();
        if stored_code.is_empty() || stored_code != presented {
            return Err(OAuth2Error::not_found("invalid code"));
        }

        self.factory
            .generate_token(
                store,
                &client.client_id,
                client.token_expiration,
                client.refresh_token_ttl,
                &scope,
                true,
            )
            .await
            .map_err(generate_error)
    }

    /// `client_credentials` grant.
    async fn client_credentials(
        &self,
        store: &dyn TokenStore,
        client: &Client,
    ) -> OAuth2Result<Token> {
        self.factory
            .generate_token(
                store,
                &client.client_id,
                client.token_expiration,
                client.refresh_token_ttl,
                "",
                false,
            )
            .await
            .map_err(generate_error)
    }
}

fn generate_error(err: OAuth2Error) -> OAuth2Error {
    OAuth2Error::storage(format!("generate token error: {err}"))
}
