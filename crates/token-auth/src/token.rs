//! Token values and the in-memory token store
//!
//! A `Token` is immutable once created: every successful token or refresh
//! request replaces both the access and refresh token together. Validity is
//! evaluated lazily against the clock at call time; nothing runs in the
//! background. Timestamps use `tokio::time::Instant` so tests can drive
//! expiry with a paused clock.

use std::fmt;
use std::time::Duration;

use common::Secret;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::error;

use crate::error::AuthError;

/// An opaque bearer token with its server-declared validity window.
#[derive(Debug, Clone)]
pub struct Token {
    value: Secret<String>,
    max_age: Duration,
    issued_at: Instant,
}

impl Token {
    /// Create a token issued now.
    pub fn new(value: impl Into<String>, max_age_secs: u64) -> Self {
        Self::with_issue_time(value, max_age_secs, Instant::now())
    }

    pub fn with_issue_time(value: impl Into<String>, max_age_secs: u64, issued_at: Instant) -> Self {
        Self {
            value: Secret::new(value.into()),
            max_age: Duration::from_secs(max_age_secs),
            issued_at,
        }
    }

    pub fn value(&self) -> &str {
        self.value.expose()
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    /// A token is expired once `now - issued_at >= max_age`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.issued_at) >= self.max_age
    }

    pub fn is_valid_at(&self, now: Instant) -> bool {
        !self.is_expired_at(now)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Instant::now())
    }
}

/// Successful token endpoint response.
///
/// Every field is required: a body missing any of them is rejected as a
/// whole, so an access token is never stored without its refresh token.
/// The metadata fields are kept as raw JSON; any value, `null` included,
/// is accepted as long as the key is present.
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Seconds until the access token expires (delta, not absolute)
    pub expires_in: u64,
    pub refresh_token: String,
    /// Seconds until the refresh token expires (delta, not absolute)
    pub refresh_expires_in: u64,
    pub token_type: serde_json::Value,
    #[serde(rename = "not-before-policy")]
    pub not_before_policy: serde_json::Value,
    pub session_state: serde_json::Value,
}

impl TokenResponse {
    /// Parse a token endpoint body.
    pub fn parse(body: &str) -> Result<Self, AuthError> {
        serde_json::from_str(body).map_err(|e| {
            if e.is_data() {
                error!(error = %e, "malformed response");
                AuthError::Response(format!("malformed response: {e}"))
            } else {
                error!(error = %e, "could not decode response");
                AuthError::Response(format!("could not decode response: {e}"))
            }
        })
    }
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &"[REDACTED]")
            .field("refresh_expires_in", &self.refresh_expires_in)
            .field("token_type", &self.token_type)
            .field("not_before_policy", &self.not_before_policy)
            .field("session_state", &self.session_state)
            .finish()
    }
}

/// Non-secret metadata returned alongside the tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub token_type: serde_json::Value,
    pub not_before_policy: serde_json::Value,
    pub session_state: serde_json::Value,
}

/// Where the cached tokens stand at a given instant.
#[derive(Debug)]
pub enum TokenState<'a> {
    /// Nothing cached yet.
    NoToken,
    /// Access token usable as-is.
    Valid(&'a Token),
    /// Access token expired but the refresh token is still usable.
    AccessExpired { refresh: &'a Token },
    /// Both tokens expired; full re-authentication needed.
    Expired,
}

#[derive(Debug)]
struct Session {
    access: Token,
    refresh: Token,
    info: SessionInfo,
}

/// Current access and refresh token for one client.
#[derive(Debug, Default)]
pub struct TokenStore {
    session: Option<Session>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify the cached tokens against `now`.
    pub fn state_at(&self, now: Instant) -> TokenState<'_> {
        match &self.session {
            None => TokenState::NoToken,
            Some(session) if session.access.is_valid_at(now) => TokenState::Valid(&session.access),
            Some(session) if session.refresh.is_valid_at(now) => TokenState::AccessExpired {
                refresh: &session.refresh,
            },
            Some(_) => TokenState::Expired,
        }
    }

    /// Replace both tokens from a parsed response, stamping them with `now`.
    ///
    /// Returns the new access token.
    pub fn store(&mut self, response: TokenResponse, now: Instant) -> &Token {
        let TokenResponse {
            access_token,
            expires_in,
            refresh_token,
            refresh_expires_in,
            token_type,
            not_before_policy,
            session_state,
        } = response;

        let session = self.session.insert(Session {
            access: Token::with_issue_time(access_token, expires_in, now),
            refresh: Token::with_issue_time(refresh_token, refresh_expires_in, now),
            info: SessionInfo {
                token_type,
                not_before_policy,
                session_state,
            },
        });
        &session.access
    }

    pub fn access_token(&self) -> Option<&Token> {
        self.session.as_ref().map(|s| &s.access)
    }

    pub fn refresh_token(&self) -> Option<&Token> {
        self.session.as_ref().map(|s| &s.refresh)
    }

    pub fn info(&self) -> Option<&SessionInfo> {
        self.session.as_ref().map(|s| &s.info)
    }
}
