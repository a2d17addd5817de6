//! Token endpoint parameter normalization.
//!
//! Parameters may arrive in the query string, a form-encoded body or a JSON
//! object body. They are merged into one map: query parameters first, body
//! parameters overriding them. Within one source the first occurrence of a
//! name wins.

use std::collections::HashMap;

use axum::http::{HeaderMap, header::CONTENT_TYPE};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Merges query and body parameters into one map.
///
/// Unparseable JSON bodies contribute nothing, as do bodies of any other
/// content type.
#[must_use]
pub fn collect_params(query: Option<&str>, headers: &HeaderMap, body: &[u8]) -> HashMap<String, String> {
    let mut params = query.map(parse_urlencoded).unwrap_or_default();

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if content_type.contains(FORM_CONTENT_TYPE) {
        params.extend(parse_urlencoded_bytes(body));
    } else if content_type.contains(JSON_CONTENT_TYPE) {
        match serde_json::from_slice::<HashMap<String, String>>(body) {
            Ok(json) => params.extend(json),
            Err(e) => tracing::debug!(error = %e, "Ignoring malformed JSON token request body"),
        }
    }

    params
}

fn parse_urlencoded(input: &str) -> HashMap<String, String> {
    parse_urlencoded_bytes(input.as_bytes())
}

fn parse_urlencoded_bytes(input: &[u8]) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for (name, value) in url::form_urlencoded::parse(input) {
        params
            .entry(name.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    params
}

/// Extracts one parameter from a raw query string.
pub(crate) fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
