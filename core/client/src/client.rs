//! NexusHub REST API client.

use bytes::Bytes;
use reqwest::{multipart::Form, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

use nexushub_common::{Error, Result, SecretString};

use crate::config::ClientConfig;
use crate::envelope::{error_detail, unwrap_envelope};

/// HTTP client for the NexusHub backend.
///
/// Shared by every storage provider; cheap to wrap in an `Arc`.
pub struct ApiClient {
    http: Client,
    base_url: String,
    config: ClientConfig,
    token: RwLock<Option<SecretString>>,
}

impl ApiClient {
    /// Create a new client.
    ///
    /// # Errors
    /// - Invalid base URL
    /// - HTTP client construction failure
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = config.normalized_base_url()?;

        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            config,
            token: RwLock::new(None),
        })
    }

    /// Attach a bearer token to every subsequent request.
    pub fn with_token(self, token: Option<SecretString>) -> Self {
        self.set_token(token);
        self
    }

    /// Replace the bearer token.
    pub fn set_token(&self, token: Option<SecretString>) {
        let token = token.filter(|t| !t.is_empty());
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    /// Whether a bearer token is currently attached.
    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// API base URL, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL for an API path starting with `/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET a JSON resource.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let request = self.http.get(self.url(path)).query(query);
        let response = self.send(request, "GET", path).await?;
        Self::parse_envelope(response).await
    }

    /// PUT a JSON body and parse the JSON response.
    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.http.put(self.url(path)).json(body);
        let response = self.send(request, "PUT", path).await?;
        Self::parse_envelope(response).await
    }

    /// DELETE a resource and parse the JSON response.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.http.delete(self.url(path));
        let response = self.send(request, "DELETE", path).await?;
        Self::parse_envelope(response).await
    }

    /// POST a multipart form, optionally overriding the request timeout.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
        timeout: Option<Duration>,
    ) -> Result<T> {
        let mut request = self.http.post(self.url(path)).multipart(form);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = self.send(request, "POST", path).await?;
        Self::parse_envelope(response).await
    }

    /// GET a binary resource.
    pub async fn get_bytes(&self, path: &str) -> Result<Bytes> {
        let request = self.http.get(self.url(path));
        let response = self.send(request, "GET", path).await?;
        response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("Failed to read response body: {}", e)))
    }

    /// Attach the bearer token.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.token.read().unwrap_or_else(|e| e.into_inner());
        match token.as_ref() {
            Some(token) => request.bearer_auth(token.expose()),
            None => request,
        }
    }

    /// Send a request and turn non-success statuses into errors.
    async fn send(&self, request: RequestBuilder, method: &str, path: &str) -> Result<Response> {
        debug!("{} {}", method, path);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Network(format!("{} {} timed out", method, path))
                } else {
                    Error::Network(format!("{} {} failed: {}", method, path, e))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = error_detail(&body);

        if status.as_u16() == 401 {
            // The token is kept; the caller decides whether to sign in again.
            warn!("{} {} rejected as unauthorized", method, path);
        } else {
            debug!("{} {} failed with {}: {:?}", method, path, status, detail);
        }

        Err(Error::from_status(status.as_u16(), detail))
    }

    /// Parse a JSON body and unwrap the envelope.
    async fn parse_envelope<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("Failed to read response body: {}", e)))?;

        let payload = if body.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&body)
                .map_err(|e| Error::Serialization(format!("Invalid JSON response: {}", e)))?
        };

        let data = unwrap_envelope(payload)?;
        serde_json::from_value(data)
            .map_err(|e| Error::Serialization(format!("Unexpected response shape: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(ClientConfig::new(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_get_unwraps_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"code": 0, "message": "success", "data": {"ok": true}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let value: Value = client_for(&server).get("/ping", &[]).await.unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_business_error_surfaces_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"code": 7, "message": "not allowed today"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get::<Value>("/ping", &[])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "not allowed today");
    }

    #[tokio::test]
    async fn test_http_status_is_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/files/9"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({"code": 403, "message": "owner only"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .delete::<Value>("/files/9")
            .await
            .unwrap_err();
        match err {
            Error::HttpStatus { status, message, detail } => {
                assert_eq!(status, 403);
                assert_eq!(message, "You do not have permission to perform this operation");
                assert_eq!(detail.as_deref(), Some("owner only"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bearer_token_attached_and_kept_on_401() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/theme"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).with_token(Some(SecretString::new("secret-token")));
        let err = client.get::<Value>("/theme", &[]).await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert!(client.has_token());
    }

    #[tokio::test]
    async fn test_empty_token_is_not_attached() {
        let server = MockServer::start().await;
        let client = client_for(&server).with_token(Some(SecretString::new("")));
        assert!(!client.has_token());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Bind then drop a listener to get a port nothing is serving on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = ApiClient::new(ClientConfig::new(format!("http://127.0.0.1:{}", port))).unwrap();

        let err = client.get::<Value>("/files", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn test_get_bytes_skips_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/download/3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"raw-bytes".to_vec()))
            .mount(&server)
            .await;

        let bytes = client_for(&server).get_bytes("/files/download/3").await.unwrap();
        assert_eq!(&bytes[..], b"raw-bytes");
    }
}
