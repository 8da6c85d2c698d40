//! Grant type selection
//!
//! Token requests pick their grant from whichever credentials are configured,
//! first match wins:
//!
//! 1. subject user ID + secret → token exchange
//! 2. secret → client credentials
//! 3. username + password → resource-owner password
//!
//! Refresh requests skip the selection and always use `refresh_token`.
//! Empty strings count as absent.

use std::fmt;

use common::Secret;
use tracing::{debug, error};

use crate::error::AuthError;
use crate::token::Token;

/// OAuth grant types this client can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantKind {
    TokenExchange,
    ClientCredentials,
    Password,
    RefreshToken,
}

impl GrantKind {
    /// Value sent as the `grant_type` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantKind::TokenExchange => "urn:ietf:params:oauth:grant-type:token-exchange",
            GrantKind::ClientCredentials => "client_credentials",
            GrantKind::Password => "password",
            GrantKind::RefreshToken => "refresh_token",
        }
    }

    /// Which kind of endpoint call this grant makes, for logs and metrics.
    pub fn request_kind(&self) -> &'static str {
        match self {
            GrantKind::RefreshToken => "refresh",
            _ => "token",
        }
    }
}

/// Optional credentials supplied at client construction.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub secret: Option<Secret<String>>,
    pub username: Option<String>,
    pub password: Option<Secret<String>>,
    pub subject_user_id: Option<String>,
}

impl Credentials {
    fn secret(&self) -> Option<&str> {
        non_empty(self.secret.as_ref().map(|s| s.expose().as_str()))
    }

    fn username(&self) -> Option<&str> {
        non_empty(self.username.as_deref())
    }

    fn password(&self) -> Option<&str> {
        non_empty(self.password.as_ref().map(|s| s.expose().as_str()))
    }

    fn subject_user_id(&self) -> Option<&str> {
        non_empty(self.subject_user_id.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// A fully built grant: its kind plus the form fields to POST.
#[derive(Clone)]
pub struct Grant {
    kind: GrantKind,
    form: Vec<(&'static str, String)>,
}

impl Grant {
    pub fn kind(&self) -> GrantKind {
        self.kind
    }

    pub fn form(&self) -> &[(&'static str, String)] {
        &self.form
    }

    pub fn into_form(self) -> Vec<(&'static str, String)> {
        self.form
    }

    /// Look up a single form field.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

// Form values carry secrets, so only the keys are shown.
impl fmt::Debug for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grant")
            .field("kind", &self.kind)
            .field("fields", &self.form.iter().map(|(k, _)| *k).collect::<Vec<_>>())
            .finish()
    }
}

/// Pick the grant for a token (not refresh) request.
///
/// Fails with `AuthError::Configuration` when no supported credential
/// combination is present; nothing is sent in that case.
pub fn select(client_id: &str, credentials: &Credentials) -> Result<Grant, AuthError> {
    let mut form = vec![("client_id", client_id.to_owned())];

    let kind = if let (Some(subject), Some(secret)) =
        (credentials.subject_user_id(), credentials.secret())
    {
        form.push(("client_secret", secret.to_owned()));
        form.push(("requested_subject", subject.to_owned()));
        GrantKind::TokenExchange
    } else if let Some(secret) = credentials.secret() {
        form.push(("client_secret", secret.to_owned()));
        GrantKind::ClientCredentials
    } else if let (Some(username), Some(password)) =
        (credentials.username(), credentials.password())
    {
        form.push(("username", username.to_owned()));
        form.push(("password", password.to_owned()));
        GrantKind::Password
    } else {
        error!("missing credentials for supported grant types");
        return Err(AuthError::Configuration);
    };

    debug!(grant_type = kind.as_str(), "selected grant type");
    form.insert(0, ("grant_type", kind.as_str().to_owned()));
    Ok(Grant { kind, form })
}

/// Build a refresh request. The client secret is included when configured.
pub fn refresh(client_id: &str, credentials: &Credentials, refresh_token: &Token) -> Grant {
    let mut form = vec![
        ("grant_type", GrantKind::RefreshToken.as_str().to_owned()),
        ("client_id", client_id.to_owned()),
        ("refresh_token", refresh_token.value().to_owned()),
    ];
    if let Some(secret) = credentials.secret() {
        form.push(("client_secret", secret.to_owned()));
    }
    Grant {
        kind: GrantKind::RefreshToken,
        form,
    }
}
