//! # apinto-oauth2
//!
//! OAuth2 credential engine for the Apinto API gateway.
//!
//! This crate provides:
//! - Grant processing for `authorization_code`, `client_credentials` and
//!   `refresh_token`
//! - Opaque token minting and per-request access token validation
//! - A storage convention over a shared, TTL-capable hash-map cache so any
//!   gateway instance can validate or refresh any token
//! - Bulk import/export of access token records
//! - Axum handlers and a bearer extractor
//!
//! ## Modules
//!
//! - [`storage`] - `TokenStore` trait, key namespace, in-memory store, cache
//!   and client registries
//! - [`secret`] - Client secret verification, plain or PBKDF2-derived
//! - [`token`] - Token factory and validator
//! - [`oauth`] - Grant state machine
//! - [`bulk`] - Token import/export
//! - [`http`] - Axum handlers for the token and admin endpoints
//! - [`middleware`] - Bearer extractor and error responses

pub mod bulk;
pub mod clock;
pub mod error;
pub mod http;
pub mod middleware;
pub mod oauth;
pub mod secret;
pub mod storage;
pub mod token;
pub mod types;

pub use bulk::{BulkTokens, LooseValue, TokenBatch, TokenData};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ErrorCategory, OAuth2Error};
pub use http::{AdminState, TokenState, import_tokens_handler, list_tokens_handler, token_handler};
pub use middleware::{BearerClient, BearerRejection, BearerState};
pub use oauth::GrantProcessor;
pub use secret::{HashRule, verify_client_secret};
pub use storage::{
    CacheRegistry, ClientRegistry, KeyCategory, KeyNamespace, MemoryTokenStore,
    StaticClientRegistry, TokenStore,
};
pub use token::{TokenFactory, TokenValidator};
pub use types::{Client, GrantResponse, GrantType, Token, TokenRequest};

/// Type alias for OAuth2 results.
pub type OAuth2Result<T> = Result<T, OAuth2Error>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use apinto_oauth2::prelude::*;
/// ```
pub mod prelude {
    pub use crate::OAuth2Result;
    pub use crate::bulk::{BulkTokens, TokenBatch};
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::error::{ErrorCategory, OAuth2Error};
    pub use crate::http::{AdminState, TokenState};
    pub use crate::middleware::{BearerClient, BearerState};
    pub use crate::oauth::GrantProcessor;
    pub use crate::storage::{
        CacheRegistry, ClientRegistry, KeyNamespace, MemoryTokenStore, StaticClientRegistry,
        TokenStore,
    };
    pub use crate::token::{TokenFactory, TokenValidator};
    pub use crate::types::{Client, GrantType, Token, TokenRequest};
}
