//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The client secret and password are loaded from `CLIENT_SECRET` /
//! `CLIENT_PASSWORD` or from the `secret_file` / `password_file` paths,
//! never stored in the TOML directly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use common::Secret;
use serde::Deserialize;
use token_auth::ClientConfig;

pub const SECRET_ENV: &str = "CLIENT_SECRET";
pub const PASSWORD_ENV: &str = "CLIENT_PASSWORD";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Token endpoint settings
#[derive(Debug, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    pub client_id: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Credentials selecting the grant type. All optional.
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub subject_user_id: Option<String>,
    #[serde(default)]
    pub secret_file: Option<PathBuf>,
    #[serde(default)]
    pub password_file: Option<PathBuf>,
    #[serde(skip)]
    pub secret: Option<Secret<String>>,
    #[serde(skip)]
    pub password: Option<Secret<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_timeout() -> u64 {
    token_auth::DEFAULT_TIMEOUT.as_secs()
}

impl Config {
    /// Load configuration from a TOML file, then overlay secrets from the
    /// environment or secret files.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if !config.endpoint.url.starts_with("http://")
            && !config.endpoint.url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "endpoint url must start with http:// or https://, got: {}",
                config.endpoint.url
            )));
        }

        if config.endpoint.client_id.trim().is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }

        if config.endpoint.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        config.credentials.secret =
            resolve_secret(SECRET_ENV, config.credentials.secret_file.as_deref())?;
        config.credentials.password =
            resolve_secret(PASSWORD_ENV, config.credentials.password_file.as_deref())?;

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("oauth-token.toml")
    }

    /// Build the client configuration.
    pub fn client_config(&self) -> ClientConfig {
        let credentials = &self.credentials;
        let mut client = ClientConfig::new(&self.endpoint.url, &self.endpoint.client_id)
            .with_timeout(Duration::from_secs(self.endpoint.timeout_secs));
        client.credentials.secret = credentials.secret.clone();
        client.credentials.password = credentials.password.clone();
        client.credentials.username = credentials.username.clone();
        client.credentials.subject_user_id = credentials.subject_user_id.clone();
        client
    }
}

/// Env var wins over file; a blank value counts as unset.
fn resolve_secret(env: &str, file: Option<&Path>) -> common::Result<Option<Secret<String>>> {
    if let Ok(value) = std::env::var(env) {
        if !value.is_empty() {
            return Ok(Some(Secret::new(value)));
        }
    }
    let Some(path) = file else {
        return Ok(None);
    };
    let value = std::fs::read_to_string(path).map_err(|source| common::Error::SecretFile {
        path: path.to_path_buf(),
        source,
    })?;
    let value = value.trim().to_owned();
    Ok((!value.is_empty()).then(|| Secret::new(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that mutate environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn clear_secret_env() {
        unsafe {
            remove_env(SECRET_ENV);
            remove_env(PASSWORD_ENV);
        }
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("oauth-token.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn minimal_toml() -> &'static str {
        r#"
[endpoint]
url = "https://idp.example.com/realms/main/protocol/openid-connect/token"
client_id = "svc"

[credentials]
username = "alice"
"#
    }

    #[test]
    fn test_load_minimal_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_secret_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, minimal_toml());

        let config = Config::load(&path).unwrap();
        assert_eq!(config.endpoint.client_id, "svc");
        assert_eq!(config.endpoint.timeout_secs, 15);
        assert_eq!(config.credentials.username.as_deref(), Some("alice"));
        assert!(config.credentials.secret.is_none());
        assert!(config.credentials.password.is_none());
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/oauth-token.toml"));
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        assert!(matches!(Config::load(&path), Err(common::Error::Toml(_))));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[endpoint]
url = "ftp://idp.example.com/token"
client_id = "svc"
"#,
        );
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("http:// or https://"), "got: {err}");
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[endpoint]
url = "https://idp.example.com/token"
client_id = "svc"
timeout_secs = 0
"#,
        );
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"), "got: {err}");
    }

    #[test]
    fn test_rejects_blank_client_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[endpoint]
url = "https://idp.example.com/token"
client_id = "  "
"#,
        );
        assert!(matches!(Config::load(&path), Err(common::Error::Config(_))));
    }

    #[test]
    fn test_secrets_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, minimal_toml());

        unsafe {
            set_env(SECRET_ENV, "env-secret");
            set_env(PASSWORD_ENV, "env-password");
        }
        let config = Config::load(&path).unwrap();
        clear_secret_env();

        assert_eq!(config.credentials.secret.as_ref().unwrap().expose(), "env-secret");
        assert_eq!(
            config.credentials.password.as_ref().unwrap().expose(),
            "env-password"
        );
    }

    #[test]
    fn test_secrets_from_files() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_secret_env();
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("client_secret");
        let password_path = dir.path().join("password");
        std::fs::write(&secret_path, "file-secret\n").unwrap();
        std::fs::write(&password_path, "file-password\n").unwrap();

        let path = write_config(
            &dir,
            &format!(
                r#"
[endpoint]
url = "https://idp.example.com/token"
client_id = "svc"

[credentials]
secret_file = "{}"
password_file = "{}"
"#,
                secret_path.display(),
                password_path.display()
            ),
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.credentials.secret.as_ref().unwrap().expose(), "file-secret");
        assert_eq!(
            config.credentials.password.as_ref().unwrap().expose(),
            "file-password"
        );
    }

    #[test]
    fn test_env_overrides_secret_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_secret_env();
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("client_secret");
        std::fs::write(&secret_path, "file-secret").unwrap();

        let path = write_config(
            &dir,
            &format!(
                r#"
[endpoint]
url = "https://idp.example.com/token"
client_id = "svc"

[credentials]
secret_file = "{}"
"#,
                secret_path.display()
            ),
        );

        unsafe { set_env(SECRET_ENV, "env-secret") };
        let config = Config::load(&path).unwrap();
        clear_secret_env();

        assert_eq!(config.credentials.secret.as_ref().unwrap().expose(), "env-secret");
    }

    #[test]
    fn test_missing_secret_file_is_an_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_secret_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[endpoint]
url = "https://idp.example.com/token"
client_id = "svc"

[credentials]
secret_file = "/nonexistent/client_secret"
"#,
        );

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, common::Error::SecretFile { .. }), "got: {err:?}");
    }

    #[test]
    fn test_client_config_carries_everything() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_secret_env();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[endpoint]
url = "https://idp.example.com/token"
client_id = "svc"
timeout_secs = 5

[credentials]
username = "alice"
subject_user_id = "user-42"

[logging]
format = "json"
"#,
        );

        unsafe { set_env(SECRET_ENV, "s3cret") };
        let config = Config::load(&path).unwrap();
        clear_secret_env();

        assert_eq!(config.logging.format, LogFormat::Json);
        let client = config.client_config();
        assert_eq!(client.endpoint_url, "https://idp.example.com/token");
        assert_eq!(client.client_id, "svc");
        assert_eq!(client.timeout, Duration::from_secs(5));
        assert_eq!(client.credentials.username.as_deref(), Some("alice"));
        assert_eq!(client.credentials.subject_user_id.as_deref(), Some("user-42"));
        assert_eq!(client.credentials.secret.as_ref().unwrap().expose(), "s3cret");
    }

    #[test]
    fn test_resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(path, PathBuf::from("/cli/wins.toml"));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        let path = Config::resolve_path(None);
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(path, PathBuf::from("/env/path.toml"));
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        assert_eq!(Config::resolve_path(None), PathBuf::from("oauth-token.toml"));
    }
}
