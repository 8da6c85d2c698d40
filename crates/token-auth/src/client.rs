//! Auth client: token lifecycle and authorization header
//!
//! `get_access_token()` walks the cached tokens through
//! `NoToken → Valid → AccessExpired → Expired → Valid`:
//!
//! - nothing cached, or both tokens expired → token request (grant selected)
//! - access token valid → cached value, no I/O
//! - access token expired, refresh token valid → refresh request
//!
//! The token store sits behind a `tokio::sync::Mutex` held across the whole
//! check-then-request sequence, so concurrent callers on one client share a
//! single endpoint round trip instead of racing. No retries, no background
//! refresh: a failed request surfaces immediately and leaves the previously
//! cached tokens untouched.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use common::Secret;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::error::{AuthError, NoTokenError, RequestError, Result};
use crate::grant::{self, Credentials, Grant, GrantKind};
use crate::token::{SessionInfo, TokenResponse, TokenState, TokenStore};
use crate::transport::{FormRequest, HttpTransport, Transport};

/// Default token endpoint request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Endpoint and credentials, fixed at construction.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint_url: String,
    pub client_id: String,
    pub credentials: Credentials,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(endpoint_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            client_id: client_id.into(),
            credentials: Credentials::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.credentials.secret = Some(Secret::new(secret.into()));
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.credentials.username = Some(username.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.credentials.password = Some(Secret::new(password.into()));
        self
    }

    pub fn with_subject_user_id(mut self, subject_user_id: impl Into<String>) -> Self {
        self.credentials.subject_user_id = Some(subject_user_id.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Acquires, caches and refreshes an access token for one set of credentials.
pub struct AuthClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    store: Mutex<TokenStore>,
    // Copy of the latest metadata, readable while a request holds `store`.
    info: RwLock<Option<SessionInfo>>,
}

impl AuthClient {
    /// Client using the default reqwest transport.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            store: Mutex::new(TokenStore::new()),
            info: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Return a valid access token, requesting or refreshing one if needed.
    pub async fn get_access_token(&self) -> Result<String> {
        let mut store = self.store.lock().await;

        let grant = match store.state_at(Instant::now()) {
            TokenState::Valid(access) => return Ok(access.value().to_owned()),
            TokenState::NoToken => {
                debug!("requesting new access token ...");
                grant::select(&self.config.client_id, &self.config.credentials)?
            }
            TokenState::AccessExpired { refresh } => {
                debug!("access token expired");
                debug!("requesting access token refresh ...");
                grant::refresh(&self.config.client_id, &self.config.credentials, refresh)
            }
            TokenState::Expired => {
                debug!("access token expired");
                debug!("refresh token expired");
                debug!("requesting new access token ...");
                grant::select(&self.config.client_id, &self.config.credentials)?
            }
        };

        let response = self.request(grant).await?;
        let access = store.store(response, Instant::now()).value().to_owned();
        let info = store.info().cloned();
        *self.info.write().unwrap_or_else(|e| e.into_inner()) = info;
        Ok(access)
    }

    /// `Authorization: Bearer <token>` for the current access token.
    pub async fn get_header(&self) -> Result<HeaderMap> {
        let token = self.get_access_token().await?;
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            error!(error = %e, "access token is not a valid header value");
            NoTokenError::from(AuthError::Response(format!(
                "access token is not a valid header value: {e}"
            )))
        })?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    /// Metadata from the most recent successful response, if any.
    ///
    /// Reads a snapshot kept outside the token lock, so it never waits for
    /// an in-flight token request.
    pub fn session_info(&self) -> Option<SessionInfo> {
        self.info.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn request(&self, grant: Grant) -> std::result::Result<TokenResponse, AuthError> {
        let grant_kind = grant.kind();
        let kind = grant_kind.request_kind();

        let request = FormRequest {
            url: self.config.endpoint_url.clone(),
            form: grant.into_form(),
            timeout: self.config.timeout,
        };

        let started = std::time::Instant::now();
        let result = self.send(kind, &request).await;
        crate::metrics::record_request(kind, result.is_ok(), started.elapsed().as_secs_f64());

        if result.is_ok() {
            match grant_kind {
                GrantKind::RefreshToken => debug!("requesting access token refresh successful"),
                _ => debug!("requesting new access token successful"),
            }
        }
        result
    }

    async fn send(
        &self,
        kind: &'static str,
        request: &FormRequest,
    ) -> std::result::Result<TokenResponse, AuthError> {
        let response = self.transport.send(request).await.map_err(|e| {
            error!(kind, error = %e, "request failed");
            AuthError::Request {
                kind,
                source: RequestError::from(e),
            }
        })?;

        if response.status != 200 {
            error!(
                kind,
                status = response.status,
                body = %response.body,
                "request got bad response"
            );
            return Err(AuthError::Request {
                kind,
                source: RequestError::Status {
                    status: response.status,
                    body: response.body,
                },
            });
        }

        TokenResponse::parse(&response.body)
    }
}
