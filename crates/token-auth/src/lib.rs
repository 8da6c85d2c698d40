//! OAuth2 machine-to-machine token client
//!
//! Acquires an access token from a token endpoint, caches it in memory and
//! transparently refreshes (or re-authenticates) when it expires. Only the
//! grant types that need no user interaction are supported: password,
//! client credentials, token exchange, and refresh.
//!
//! Token lifecycle for `AuthClient::get_access_token()`:
//! 1. No token cached → token request using the grant picked by `grant::select`
//! 2. Access token still valid → cached value, no I/O
//! 3. Access token expired, refresh token valid → refresh request
//! 4. Both expired → full token request again
//!
//! Every internal failure surfaces as a single `NoTokenError`, which keeps
//! the original `AuthError` as its source.

pub mod client;
pub mod error;
pub mod grant;
pub mod metrics;
pub mod token;
pub mod transport;

pub use client::{AuthClient, ClientConfig, DEFAULT_TIMEOUT};
pub use error::{AuthError, NoTokenError, RequestError, Result, TransportError};
pub use grant::{Credentials, Grant, GrantKind};
pub use token::{SessionInfo, Token, TokenResponse, TokenState, TokenStore};
pub use transport::{FormRequest, HttpTransport, Transport, TransportResponse};
