//! Error types for token acquisition
//!
//! Internal operations return `AuthError`. The client boundary folds every
//! one of them into `NoTokenError`, so callers only ever match on a single
//! failure kind; the original cause stays reachable through `source()` and
//! `NoTokenError::cause()` for logging.

/// Failures reported by a `Transport` implementation.
///
/// Any HTTP response, whatever its status, is a success at this level.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Url(String),
}

/// A token endpoint request that did not produce a usable response.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    Connect(String),

    #[error("token endpoint returned {status}")]
    Status { status: u16, body: String },
}

impl From<TransportError> for RequestError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(msg) => RequestError::Timeout(msg),
            TransportError::Url(msg) => RequestError::Connect(msg),
        }
    }
}

/// Internal failure taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing credentials for supported grant types")]
    Configuration,

    #[error("{kind} request failed: {source}")]
    Request {
        kind: &'static str,
        #[source]
        source: RequestError,
    },

    #[error("malformed token response: {0}")]
    Response(String),
}

/// The only failure `AuthClient` exposes.
#[derive(Debug, thiserror::Error)]
#[error("no token available: {0}")]
pub struct NoTokenError(#[source] AuthError);

impl NoTokenError {
    /// The internal failure that prevented a token from being produced.
    pub fn cause(&self) -> &AuthError {
        &self.0
    }

    pub fn into_cause(self) -> AuthError {
        self.0
    }
}

impl From<AuthError> for NoTokenError {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

/// Result alias for the public client surface.
pub type Result<T> = std::result::Result<T, NoTokenError>;
