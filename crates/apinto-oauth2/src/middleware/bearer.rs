//! Bearer token extractor for protected routes.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use apinto_oauth2::middleware::{BearerClient, BearerState};
//!
//! async fn protected(BearerClient(client_id): BearerClient) -> String {
//!     format!("hello, {client_id}")
//! }
//!
//! let app = Router::new()
//!     .route("/protected", get(protected))
//!     .with_state(bearer_state);
//! ```

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use super::error::BearerRejection;
use crate::error::OAuth2Error;
use crate::http::params::query_param;
use crate::token::TokenValidator;

const ACCESS_TOKEN_PARAM: &str = "access_token";

/// State required for bearer authentication.
///
/// Include it in the application state and expose it through `FromRef`.
#[derive(Clone)]
pub struct BearerState {
    pub validator: TokenValidator,
}

impl BearerState {
    pub fn new(validator: TokenValidator) -> Self {
        Self { validator }
    }
}

/// Extractor resolving the request's bearer token to its client id.
///
/// The token is taken from `Authorization: Bearer <token>`, falling back to
/// the `access_token` query parameter.
pub struct BearerClient(pub String);

impl<S> FromRequestParts<S> for BearerClient
where
    S: Send + Sync,
    BearerState: FromRef<S>,
{
    type Rejection = BearerRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let bearer = BearerState::from_ref(state);

        let token = extract_token_from_header(parts)
            .or_else(|| query_param(parts.uri.query(), ACCESS_TOKEN_PARAM))
            .filter(|token| !token.is_empty())
            .ok_or_else(|| OAuth2Error::validation("missing bearer token"))?;

        let client_id = bearer.validator.validate(&token).await.map_err(|e| {
            tracing::debug!(error = %e, "Bearer token rejected");
            e
        })?;

        tracing::debug!(client_id = %client_id, "Bearer token validated");
        Ok(BearerClient(client_id))
    }
}

fn extract_token_from_header(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}
