//! HTTP transport for generation backends
//!
//! Adapters build an `HttpRequest` and hand it to an `HttpTransport`. The
//! production transport is a plain `reqwest::Client` with its default
//! timeouts; tests substitute a recording mock.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// A JSON POST request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl HttpRequest {
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body: Value::Null,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Look up a header value by case-insensitive name
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response with its body read as text
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Canonical reason phrase, e.g. "Not Found"
    pub reason: String,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request could not be completed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportFailure(pub String);

/// Sends JSON requests over HTTP
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure>;
}

/// Transport backed by `reqwest`
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, request: HttpRequest) -> Result<HttpResponse, TransportFailure> {
        let mut builder = self.client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportFailure(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportFailure(e.to_string()))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::post("https://example.com/generate")
            .header("Authorization", "Bearer abc")
            .json(json!({"input": "hi"}));

        assert_eq!(request.url, "https://example.com/generate");
        assert_eq!(request.header_value("authorization"), Some("Bearer abc"));
        assert_eq!(request.body["input"], "hi");
    }

    #[test]
    fn test_response_success_range() {
        let mut response = HttpResponse {
            status: 200,
            reason: "OK".to_string(),
            body: String::new(),
        };
        assert!(response.is_success());
        response.status = 201;
        assert!(response.is_success());
        response.status = 404;
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_mock_replays_in_order() {
        let mock = mock::MockTransport::new()
            .respond(200, json!({"ok": true}))
            .fail("connection refused");

        let first = mock.post_json(HttpRequest::post("a")).await.unwrap();
        assert_eq!(first.reason, "OK");
        let second = mock.post_json(HttpRequest::post("b")).await;
        assert_eq!(
            second,
            Err(TransportFailure("connection refused".to_string()))
        );
        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.requests()[1].url, "b");
    }
}
