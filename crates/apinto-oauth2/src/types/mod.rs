//! Domain types for OAuth2 clients and token endpoint payloads.

pub mod client;
pub mod token;

pub use client::{Client, DEFAULT_REFRESH_TOKEN_TTL, DEFAULT_TOKEN_EXPIRATION, GrantType};
pub use token::{GrantResponse, TOKEN_TYPE_BEARER, Token, TokenRequest};
