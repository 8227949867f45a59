//! Outbound HTTP seam shared by the OpenAI providers and the tracking client

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use serde_json::Value;
use std::pin::Pin;
use std::time::Duration;

use crate::domain::DomainError;

/// Stream type for HTTP responses
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, DomainError>> + Send>>;

/// Map a non-success status to the matching domain error
pub fn error_for_status(provider: &str, status: u16, body: &str) -> DomainError {
    let message = format!("HTTP {}: {}", status, body);

    match StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR) {
        StatusCode::TOO_MANY_REQUESTS => DomainError::rate_limited(provider, message),
        StatusCode::CONFLICT => DomainError::conflict(message),
        StatusCode::NOT_FOUND => DomainError::not_found(message),
        _ => DomainError::provider(provider, message),
    }
}

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn get_json(&self, url: &str, headers: Vec<(&str, &str)>) -> Result<Value, DomainError>;

    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &Value,
    ) -> Result<Value, DomainError>;

    async fn delete(&self, url: &str, headers: Vec<(&str, &str)>) -> Result<(), DomainError>;

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &Value,
    ) -> Result<ByteStream, DomainError>;
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DomainError::configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        headers: Vec<(&str, &str)>,
    ) -> Result<reqwest::Response, DomainError> {
        let mut request = request;

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DomainError::provider("http", format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_body = response.text().await.unwrap_or_default();
            return Err(error_for_status("http", status, &error_body));
        }

        Ok(response)
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, DomainError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DomainError::provider("http", format!("Failed to read response: {}", e)))?;

        if bytes.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| DomainError::provider("http", format!("Failed to parse response: {}", e)))
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn get_json(&self, url: &str, headers: Vec<(&str, &str)>) -> Result<Value, DomainError> {
        let response = self.send(self.client.get(url), headers).await?;
        Self::read_json(response).await
    }

    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &Value,
    ) -> Result<Value, DomainError> {
        let response = self.send(self.client.post(url).json(body), headers).await?;
        Self::read_json(response).await
    }

    async fn delete(&self, url: &str, headers: Vec<(&str, &str)>) -> Result<(), DomainError> {
        self.send(self.client.delete(url), headers).await?;
        Ok(())
    }

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &Value,
    ) -> Result<ByteStream, DomainError> {
        let response = self.send(self.client.post(url).json(body), headers).await?;

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| DomainError::provider("http", format!("Stream error: {}", e)))
        });

        Ok(Box::pin(stream))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_error_for_status_mapping() {
        assert!(error_for_status("t", 429, "slow down").is_rate_limited());
        assert!(error_for_status("t", 409, "exists").is_conflict());
        assert!(matches!(
            error_for_status("t", 404, ""),
            DomainError::NotFound { .. }
        ));
        assert!(matches!(
            error_for_status("t", 502, "bad gateway"),
            DomainError::Provider { .. }
        ));
    }

    #[tokio::test]
    async fn test_get_json_sends_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/datasets"))
            .and(header("x-api-key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"id": "1"}])))
            .mount(&server)
            .await;

        let client = HttpClient::new();
        let value = client
            .get_json(
                &format!("{}/api/v1/datasets", server.uri()),
                vec![("x-api-key", "secret")],
            )
            .await
            .unwrap();

        assert_eq!(value[0]["id"], "1");
    }

    #[tokio::test]
    async fn test_rate_limit_status_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/sessions/abc"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too many requests"))
            .mount(&server)
            .await;

        let client = HttpClient::new();
        let err = client
            .delete(&format!("{}/api/v1/sessions/abc", server.uri()), vec![])
            .await
            .unwrap_err();

        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/empty"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = HttpClient::new();
        let value = client
            .post_json(&format!("{}/empty", server.uri()), vec![], &serde_json::json!({}))
            .await
            .unwrap();

        assert!(value.is_null());
    }
}
