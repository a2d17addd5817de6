//! Administrative token import/listing endpoint.
//!
//! ```text
//! GET  /oauth_tokens/   -> {"total": N, "data": [...]}
//! POST /oauth_tokens/   <- {"total": N, "data": [...]}   -> {"code": 0}
//! ```
//!
//! Errors are reported in the body as `{"code": <int>, "err": "<message>"}`
//! with HTTP status 200: `403` when no cache backend is configured or the
//! body could not be read, `-1` for malformed payloads and backend failures.

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::bulk::{BulkTokens, TokenBatch};
use crate::error::OAuth2Error;

const CODE_FORBIDDEN: i32 = 403;
const CODE_FAILED: i32 = -1;

/// State required for the administrative endpoint.
#[derive(Clone)]
pub struct AdminState {
    pub bulk: BulkTokens,
}

impl AdminState {
    pub fn new(bulk: BulkTokens) -> Self {
        Self { bulk }
    }
}

/// In-body error report.
#[derive(Debug, Serialize)]
pub struct AdminError {
    pub code: i32,
    pub err: String,
}

impl AdminError {
    fn new(code: i32, err: impl Into<String>) -> Self {
        Self {
            code,
            err: err.into(),
        }
    }
}

impl From<OAuth2Error> for AdminError {
    fn from(err: OAuth2Error) -> Self {
        let code = match err {
            OAuth2Error::Configuration { .. } => CODE_FORBIDDEN,
            _ => CODE_FAILED,
        };
        Self::new(code, err.to_string())
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        warn!(code = self.code, error = %self.err, "Admin token request failed");
        Json(self).into_response()
    }
}

/// `GET /oauth_tokens/`: lists stored access tokens.
pub async fn list_tokens_handler(State(state): State<AdminState>) -> Response {
    match state.bulk.export().await {
        Ok(batch) => Json(batch).into_response(),
        Err(e) => AdminError::from(e).into_response(),
    }
}

/// `POST /oauth_tokens/`: imports a token batch.
pub async fn import_tokens_handler(
    State(state): State<AdminState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    // Backend availability is reported before the body is looked at.
    if let Err(e) = state.bulk.caches().primary() {
        return AdminError::from(e).into_response();
    }

    let body = match body {
        Ok(body) => body,
        Err(e) => return AdminError::new(CODE_FORBIDDEN, e.body_text()).into_response(),
    };

    let result = async {
        let batch = TokenBatch::from_slice(&body)?;
        state.bulk.import(&batch).await
    }
    .await;

    match result {
        Ok(_) => Json(json!({ "code": 0 })).into_response(),
        Err(e) => AdminError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FixedClock};
    use crate::storage::{CacheRegistry, KeyNamespace, MemoryTokenStore};
    use axum::{Router, body::Body, body::to_bytes, http::Request, http::StatusCode, routing::get};
    use std::sync::Arc;
    use tower::ServiceExt;

    const NOW_MS: i64 = 1_700_000_000_000;

    fn app(caches: CacheRegistry) -> Router {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::from_millis(NOW_MS));
        let bulk = BulkTokens::new(caches, KeyNamespace::new("test"), clock);
        Router::new()
            .route(
                "/oauth_tokens/",
                get(list_tokens_handler).post(import_tokens_handler),
            )
            .with_state(AdminState::new(bulk))
    }

    async fn call(app: Router, request: Request<Body>) -> serde_json::Value {
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_import_then_list() {
        let app = app(CacheRegistry::single("memory", Arc::new(MemoryTokenStore::new())));
        let payload = json!({
            "total": 2,
            "data": [
                {"credential": {"id": "abc"}, "access_token": "old", "created_at": NOW_MS - 1000, "expires_in": 0},
                {"credential": {"id": "abc"}, "access_token": "live", "created_at": NOW_MS - 1000, "expires_in": 3600, "scope": "read"}
            ]
        });

        let request = Request::post("/oauth_tokens/")
            .header("Content-Type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap();
        assert_eq!(call(app.clone(), request).await, json!({"code": 0}));

        let request = Request::get("/oauth_tokens/").body(Body::empty()).unwrap();
        let listed = call(app, request).await;
        assert_eq!(listed["total"], 1);
        assert_eq!(listed["data"][0]["access_token"], "live");
        assert_eq!(listed["data"][0]["scope"], "read");
        assert_eq!(listed["data"][0]["client_id"], "abc");
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let app = app(CacheRegistry::single("memory", Arc::new(MemoryTokenStore::new())));
        let request = Request::post("/oauth_tokens/")
            .body(Body::from("{not json"))
            .unwrap();
        let body = call(app, request).await;
        assert_eq!(body["code"], -1);
        assert!(body["err"].is_string());
    }

    #[tokio::test]
    async fn test_missing_backend() {
        let request = Request::get("/oauth_tokens/").body(Body::empty()).unwrap();
        let body = call(app(CacheRegistry::new()), request).await;
        assert_eq!(body["code"], 403);

        let request = Request::post("/oauth_tokens/")
            .body(Body::from("{not json"))
            .unwrap();
        let body = call(app(CacheRegistry::new()), request).await;
        assert_eq!(body["code"], 403);
    }
}
