//! HTTP transport for token endpoint calls
//!
//! The client only needs one thing from the network: POST a form-encoded
//! body with a timeout and hand back whatever came back. Any HTTP response,
//! 4xx/5xx included, is a successful send; only timeouts and connectivity
//! problems are errors, and those two are kept apart.
//!
//! TLS trust (custom CA bundles, client certificates) belongs to the
//! `reqwest::Client` passed to `HttpTransport::with_client`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::error;

use crate::error::TransportError;

/// A form-encoded POST to the token endpoint.
#[derive(Clone)]
pub struct FormRequest {
    pub url: String,
    pub form: Vec<(&'static str, String)>,
    pub timeout: Duration,
}

impl FormRequest {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Debug for FormRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormRequest")
            .field("url", &self.url)
            .field("fields", &self.form.iter().map(|(k, _)| *k).collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Raw endpoint response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
    /// Response headers keyed by lowercase name. A repeated header keeps only
    /// its last value, and values that are not valid UTF-8 are dropped.
    pub headers: HashMap<String, String>,
}

/// Sends token endpoint requests.
///
/// Uses `Pin<Box<dyn Future>>` so the client can hold an `Arc<dyn Transport>`.
pub trait Transport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: &'a FormRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>>;
}

/// `Transport` backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, root certificates, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn send<'a>(
        &'a self,
        request: &'a FormRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&request.url)
                .form(&request.form)
                .timeout(request.timeout)
                .send()
                .await
                .map_err(|e| classify(&request.url, e))?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_owned(), v.to_owned()))
                })
                .collect();

            // The body read shares the request timeout.
            let body = response
                .text()
                .await
                .map_err(|e| classify(&request.url, e))?;

            Ok(TransportResponse {
                status,
                body,
                headers,
            })
        })
    }
}

fn classify(url: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        error!(url, "timed out - POST");
        TransportError::Timeout(err.to_string())
    } else {
        error!(url, error = %err, "request failed");
        TransportError::Url(err.to_string())
    }
}
