//! OAuth token fetcher
//!
//! Small binary around `token_auth::AuthClient`:
//! 1. Loads the endpoint and credentials from a TOML file (+ env secrets)
//! 2. Acquires an access token with the grant the credentials allow
//! 3. Prints the raw token, or the full `Authorization` header with `--header`

mod config;

use anyhow::{Context, Result};
use token_auth::AuthClient;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, LogFormat};

/// Command line flags. Anything unrecognised is ignored.
#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    config: Option<String>,
    header: bool,
    json_logs: bool,
}

impl Args {
    fn parse(args: &[String]) -> Self {
        Self {
            config: args
                .iter()
                .position(|a| a == "--config")
                .and_then(|i| args.get(i + 1))
                .cloned(),
            header: args.iter().any(|a| a == "--header"),
            json_logs: args.iter().any(|a| a == "--json"),
        }
    }
}

/// Install the global subscriber. LOG_LEVEL wins over RUST_LOG; default `info`.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// Fetch the token (or header line) the CLI prints.
async fn fetch(client: &AuthClient, header: bool) -> Result<String> {
    if header {
        let headers = client.get_header().await?;
        let value = headers
            .get("authorization")
            .context("authorization header missing")?
            .to_str()
            .context("authorization header is not printable")?;
        Ok(format!("Authorization: {value}"))
    } else {
        Ok(client.get_access_token().await?)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let argv: Vec<String> = std::env::args().collect();
    let args = Args::parse(&argv);

    let config_path = Config::resolve_path(args.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let format = if args.json_logs {
        LogFormat::Json
    } else {
        config.logging.format
    };
    init_tracing(format);

    info!(
        path = %config_path.display(),
        endpoint = %config.endpoint.url,
        client_id = %config.endpoint.client_id,
        timeout_secs = config.endpoint.timeout_secs,
        "configuration loaded"
    );

    let client = AuthClient::new(config.client_config());
    match fetch(&client, args.header).await {
        Ok(output) => {
            if let Some(info) = client.session_info() {
                debug!(token_type = %info.token_type, session_state = %info.session_state, "token acquired");
            }
            println!("{output}");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "could not acquire token");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use token_auth::ClientConfig;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    const BODY: &str = r#"{"access_token":"a","expires_in":60,"refresh_token":"r","refresh_expires_in":600,"token_type":"bearer","not-before-policy":0,"session_state":"s"}"#;

    #[test]
    fn args_defaults() {
        assert_eq!(Args::parse(&argv(&["oauth-token"])), Args::default());
    }

    #[test]
    fn args_all_flags() {
        let args = Args::parse(&argv(&[
            "oauth-token",
            "--header",
            "--config",
            "/etc/oauth-token.toml",
            "--json",
        ]));
        assert_eq!(args.config.as_deref(), Some("/etc/oauth-token.toml"));
        assert!(args.header);
        assert!(args.json_logs);
    }

    #[test]
    fn args_config_without_value_is_ignored() {
        let args = Args::parse(&argv(&["oauth-token", "--config"]));
        assert!(args.config.is_none());
    }

    #[tokio::test]
    async fn fetch_prints_token_or_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(BODY))
            .expect(1)
            .mount(&server)
            .await;

        let client = AuthClient::new(ClientConfig::new(server.uri(), "svc").with_secret("s3cret"));
        assert_eq!(fetch(&client, false).await.unwrap(), "a");
        assert_eq!(fetch(&client, true).await.unwrap(), "Authorization: Bearer a");
    }

    #[tokio::test]
    async fn fetch_reports_no_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .mount(&server)
            .await;

        let client = AuthClient::new(ClientConfig::new(server.uri(), "svc").with_secret("wrong"));
        let err = fetch(&client, false).await.unwrap_err();
        assert!(err.to_string().starts_with("no token available"), "got: {err}");
    }
}
