//! Shared HTTP plumbing with bearer authentication and retry.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::QcsConfig;
use crate::error::{QcsError, QcsResult};

const MAX_BACKOFF_MS: u64 = 30_000;

/// A `reqwest` client bound to one base URL.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
    max_retries: u32,
    retry_base_delay_ms: u64,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .finish()
    }
}

impl HttpClient {
    /// Build a client for `base_url` using the timeouts, retry policy and
    /// access token from `config`.
    pub fn new(base_url: &str, config: &QcsConfig) -> QcsResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .build()
            .map_err(|e| QcsError::Http(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: config.access_token.clone().map(SecretString::from),
            max_retries: config.max_retries,
            retry_base_delay_ms: config.retry_base_delay_ms,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// `GET path?query` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> QcsResult<T> {
        let url = self.url(path);
        let response = self
            .send_with_retry(operation, || {
                self.authorize(self.client.get(&url).query(query)).send()
            })
            .await?;
        decode(operation, response).await
    }

    /// `POST path` with a JSON body and decode the JSON response.
    pub async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        body: &B,
    ) -> QcsResult<T> {
        let url = self.url(path);
        let response = self
            .send_with_retry(operation, || {
                self.authorize(self.client.post(&url).json(body)).send()
            })
            .await?;
        decode(operation, response).await
    }

    /// `POST path` with a JSON body and return the response text.
    pub async fn post_text<B: Serialize + Sync>(
        &self,
        operation: &str,
        path: &str,
        body: &B,
    ) -> QcsResult<String> {
        let url = self.url(path);
        let response = self
            .send_with_retry(operation, || {
                self.authorize(self.client.post(&url).json(body)).send()
            })
            .await?;
        response
            .text()
            .await
            .map_err(|e| QcsError::Http(format!("failed to read {operation} response: {e}")))
    }

    /// `DELETE path`, ignoring the response body.
    pub async fn delete(&self, operation: &str, path: &str) -> QcsResult<()> {
        let url = self.url(path);
        self.send_with_retry(operation, || self.authorize(self.client.delete(&url)).send())
            .await?;
        Ok(())
    }

    /// Execute a request with exponential backoff retry.
    ///
    /// Retries on: 429, 502, 503, 504 and connect/timeout errors.
    /// Does not retry any other status.
    /// Backoff: `min(base_delay * 2^attempt, 30_000ms)`.
    async fn send_with_retry<F, Fut>(
        &self,
        operation: &str,
        make_request: F,
    ) -> QcsResult<reqwest::Response>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match make_request().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        debug!(operation, %status, "request succeeded");
                        return Ok(response);
                    }

                    let body = response.text().await.unwrap_or_default();
                    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                        return Err(QcsError::AuthenticationFailed(format!(
                            "{operation} ({status}): {body}"
                        )));
                    }

                    let err = QcsError::Api {
                        operation: operation.to_string(),
                        status: status.as_u16(),
                        message: body,
                    };
                    if !err.is_transient() {
                        return Err(err);
                    }
                    last_error = Some(err);
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(QcsError::Unavailable(format!(
                        "{operation} request error: {e}"
                    )));
                }
                Err(e) => {
                    return Err(QcsError::Http(format!("{operation} request error: {e}")));
                }
            }

            if attempt < self.max_retries {
                let delay = backoff_delay_ms(self.retry_base_delay_ms, attempt);
                warn!(
                    attempt = attempt + 1,
                    max = self.max_retries,
                    delay_ms = delay,
                    "{operation} failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            QcsError::Http(format!(
                "{operation} failed after {} retries",
                self.max_retries
            ))
        }))
    }
}

async fn decode<T: DeserializeOwned>(operation: &str, response: reqwest::Response) -> QcsResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| QcsError::Http(format!("failed to parse {operation} response: {e}")))
}

fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(MAX_BACKOFF_MS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CannedServer;

    fn client(url: &str, max_retries: u32) -> HttpClient {
        let config = QcsConfig {
            max_retries,
            retry_base_delay_ms: 1,
            ..Default::default()
        };
        HttpClient::new(url, &config).unwrap()
    }

    async fn fetch(client: &HttpClient) -> QcsResult<serde_json::Value> {
        client.get_json("fetch", "/v1/thing", &[]).await
    }

    #[tokio::test]
    async fn test_retries_transient_statuses() {
        for status in [429, 502, 503, 504] {
            let server =
                CannedServer::start(vec![(status, "busy"), (status, "busy"), (200, r#"{"ok":true}"#)])
                    .await;
            let value = fetch(&client(&server.url, 3)).await.unwrap();
            assert_eq!(value["ok"], true);
            assert_eq!(server.requests().len(), 3, "status {status}");
        }
    }

    #[tokio::test]
    async fn test_surfaces_last_transient_error() {
        let server = CannedServer::start(vec![(502, "bad gateway"), (503, "still down")]).await;
        let err = fetch(&client(&server.url, 2)).await.unwrap_err();
        assert!(matches!(
            err,
            QcsError::Api { status: 503, ref message, .. } if message == "still down"
        ));
        assert!(err.is_transient());
        assert_eq!(server.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        for status in [400, 404] {
            let server = CannedServer::start(vec![(status, "nope")]).await;
            let err = fetch(&client(&server.url, 3)).await.unwrap_err();
            assert!(matches!(err, QcsError::Api { status: s, .. } if s == status));
            assert_eq!(server.requests().len(), 1, "status {status}");
        }
    }

    #[tokio::test]
    async fn test_auth_failures_are_not_retried() {
        for status in [401, 403] {
            let server = CannedServer::start(vec![(status, "token expired")]).await;
            let err = fetch(&client(&server.url, 3)).await.unwrap_err();
            assert!(
                matches!(err, QcsError::AuthenticationFailed(ref msg) if msg.contains("token expired"))
            );
            assert_eq!(server.requests().len(), 1, "status {status}");
        }
    }

    #[tokio::test]
    async fn test_connect_errors_are_retried_then_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = fetch(&client(&url, 2)).await.unwrap_err();
        assert!(matches!(err, QcsError::Unavailable(_)));
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(backoff_delay_ms(500, 0), 500);
        assert_eq!(backoff_delay_ms(500, 1), 1_000);
        assert_eq!(backoff_delay_ms(500, 3), 4_000);
        assert_eq!(backoff_delay_ms(500, 10), MAX_BACKOFF_MS);
        assert_eq!(backoff_delay_ms(u64::MAX, 40), MAX_BACKOFF_MS);
    }

    #[test]
    fn test_url_joining() {
        let config = QcsConfig::default();
        let client = HttpClient::new("https://api.example.com/", &config).unwrap();
        assert_eq!(client.base_url(), "https://api.example.com");
        assert_eq!(
            client.url("/v1/quantumProcessors"),
            "https://api.example.com/v1/quantumProcessors"
        );
        assert_eq!(client.url(""), "https://api.example.com");
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = QcsConfig {
            access_token: Some("hunter2".into()),
            ..Default::default()
        };
        let client = HttpClient::new("https://api.example.com", &config).unwrap();
        assert!(!format!("{client:?}").contains("hunter2"));
    }
}
