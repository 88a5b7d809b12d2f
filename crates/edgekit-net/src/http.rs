use crate::error::{NetError, Result};
use edgekit_core::HttpConfig;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Buffered response of a successful request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Shared HTTP client with a whole-request timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    /// Send a request and buffer the whole body.
    ///
    /// A status of 400 or above is returned as [`NetError::HttpStatus`], which
    /// still carries the body.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<Vec<u8>>,
    ) -> Result<HttpResponse> {
        debug!("{} {}", method, url);
        let mut builder = self.client.request(method, url);
        for (key, value) in headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        if status.is_client_error() || status.is_server_error() {
            return Err(NetError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body,
            });
        }

        Ok(HttpResponse {
            status: status.as_u16(),
            body,
        })
    }

    pub async fn get(&self, url: &str, headers: &HashMap<String, String>) -> Result<HttpResponse> {
        self.request(Method::GET, url, headers, None).await
    }

    pub async fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: Vec<u8>,
    ) -> Result<HttpResponse> {
        self.request(Method::POST, url, headers, Some(body)).await
    }

    pub async fn put(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: Vec<u8>,
    ) -> Result<HttpResponse> {
        self.request(Method::PUT, url, headers, Some(body)).await
    }

    pub async fn patch(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: Vec<u8>,
    ) -> Result<HttpResponse> {
        self.request(Method::PATCH, url, headers, Some(body)).await
    }

    pub async fn delete(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<HttpResponse> {
        self.request(Method::DELETE, url, headers, None).await
    }
}
