//! Error responses.
//!
//! The token endpoint rejects with `403 Forbidden` and the error message as a
//! plain-text body. Bearer authentication rejects with `401 Unauthorized` and
//! a `WWW-Authenticate` challenge, or `500` when the backend itself failed.

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::error::OAuth2Error;

impl IntoResponse for OAuth2Error {
    fn into_response(self) -> Response {
        (StatusCode::FORBIDDEN, self.to_string()).into_response()
    }
}

/// Rejection of the [`BearerClient`](super::BearerClient) extractor.
#[derive(Debug)]
pub struct BearerRejection(pub OAuth2Error);

impl From<OAuth2Error> for BearerRejection {
    fn from(err: OAuth2Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for BearerRejection {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        if self.0.is_server_error() {
            return (StatusCode::INTERNAL_SERVER_ERROR, message).into_response();
        }

        let mut response = (StatusCode::UNAUTHORIZED, message.clone()).into_response();
        if let Ok(value) = HeaderValue::from_str(&build_www_authenticate_header(&message)) {
            response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

/// Format: `Bearer realm="apinto", error="invalid_token", error_description="..."`
fn build_www_authenticate_header(description: &str) -> String {
    let escaped = description.replace('"', "\\\"");
    format!("Bearer realm=\"apinto\", error=\"invalid_token\", error_description=\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_token_endpoint_rejection() {
        let response = OAuth2Error::not_found("invalid code").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/plain")
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"invalid code");
    }

    #[test]
    fn test_bearer_rejection() {
        let response = BearerRejection(OAuth2Error::Expired).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response.headers()[header::WWW_AUTHENTICATE].to_str().unwrap();
        assert!(challenge.starts_with("Bearer realm=\"apinto\""));
        assert!(challenge.contains("error_description=\"token expired\""));

        let response = BearerRejection(OAuth2Error::storage("connection refused")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[test]
    fn test_www_authenticate_escaping() {
        let header = build_www_authenticate_header("bad \"token\"");
        assert!(header.contains("\\\"token\\\""));
    }
}
