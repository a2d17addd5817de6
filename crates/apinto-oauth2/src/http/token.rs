//! OAuth2 token endpoint handler.
//!
//! Accepts parameters from the query string, a form-encoded body or a JSON
//! object body (see [`collect_params`]). The client is resolved from the
//! `client_id` parameter and the request is handed to the
//! [`GrantProcessor`].
//!
//! # Example
//!
//! ```text
//! POST /oauth2/token
//! Content-Type: application/x-www-form-urlencoded
//!
//! client_id=abc&grant_type=client_credentials&client_secret=s3cret
//! ```
//!
//! Success is `200` with a JSON token; every failure is `403` with a
//! plain-text message.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::params::collect_params;
use crate::OAuth2Result;
use crate::error::OAuth2Error;
use crate::oauth::GrantProcessor;
use crate::storage::ClientRegistry;
use crate::types::{GrantResponse, TokenRequest};

/// State required for the token endpoint.
#[derive(Clone)]
pub struct TokenState {
    /// Grant processor issuing tokens.
    pub processor: GrantProcessor,
    /// Configured clients.
    pub clients: Arc<dyn ClientRegistry>,
}

impl TokenState {
    /// Creates a new token state.
    pub fn new(processor: GrantProcessor, clients: Arc<dyn ClientRegistry>) -> Self {
        Self { processor, clients }
    }
}

/// Token endpoint handler.
pub async fn token_handler(
    State(state): State<TokenState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let params = collect_params(query.as_deref(), &headers, &body);
    let request = TokenRequest::from_params(&params);

    debug!(
        grant_type = %request.grant_type,
        client_id = %request.client_id,
        "Processing token request"
    );

    match issue(&state, &request).await {
        Ok(response) => (
            StatusCode::OK,
            [("Cache-Control", "no-store"), ("Pragma", "no-cache")],
            Json(response),
        )
            .into_response(),
        Err(e) => {
            warn!(
                client_id = %request.client_id,
                grant_type = %request.grant_type,
                category = %e.category(),
                error = %e,
                "Token request rejected"
            );
            e.into_response()
        }
    }
}

async fn issue(state: &TokenState, request: &TokenRequest) -> OAuth2Result<GrantResponse> {
    let client = state
        .clients
        .find_by_client_id(&request.client_id)
        .await?
        .ok_or_else(|| {
            OAuth2Error::validation(format!("invalid client id: {}", request.client_id))
        })?;
    state.processor.process(&client, request).await
}
