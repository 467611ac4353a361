//! Request options and header assembly.

use crate::session::SessionToken;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;

/// Method, body and extra headers for one call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Attach a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a header. Caller headers win over the wrapper's defaults.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

/// Defaults (`Content-Type: application/json`, bearer auth when a token is
/// held) merged with the caller's headers.
pub fn build_headers(token: Option<&SessionToken>, extra: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(token) = token {
        match HeaderValue::from_str(&token.bearer()) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => {
                tracing::warn!("invalid characters in session token, sending unauthenticated");
            }
        }
    }

    for (name, value) in extra {
        headers.insert(name.clone(), value.clone());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_without_token() {
        let headers = build_headers(None, &HeaderMap::new());
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn headers_with_token() {
        let token = SessionToken::new("abc");
        let headers = build_headers(Some(&token), &HeaderMap::new());
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn caller_headers_override_defaults() {
        let mut extra = HeaderMap::new();
        extra.insert(CONTENT_TYPE, HeaderValue::from_static("multipart/form-data"));
        extra.insert(
            HeaderName::from_static("x-request-source"),
            HeaderValue::from_static("portal"),
        );

        let headers = build_headers(None, &extra);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "multipart/form-data");
        assert_eq!(headers.get("x-request-source").unwrap(), "portal");
    }

    #[test]
    fn token_with_newline_is_not_sent() {
        let token = SessionToken::new("bad\ntoken");
        let headers = build_headers(Some(&token), &HeaderMap::new());
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn builder_sets_fields() {
        let options = RequestOptions::post()
            .json(serde_json::json!({"done": true}))
            .header(
                HeaderName::from_static("x-idempotency-key"),
                HeaderValue::from_static("k1"),
            );
        assert_eq!(options.method, Method::POST);
        assert_eq!(options.body.unwrap()["done"], true);
        assert_eq!(options.headers.len(), 1);
    }
}
