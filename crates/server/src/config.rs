//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `VERDANT_DATABASE_URL` - `SQLite` connection string (e.g., sqlite://verdant.db)
//!
//! ## Optional
//! - `VERDANT_HOST` - Bind address (default: 127.0.0.1)
//! - `VERDANT_PORT` - Listen port (default: 4000)
//! - `VERDANT_BASE_URL` - Public base URL (default: http://localhost:4000);
//!   an https scheme turns on the `Secure` cookie attribute
//! - `VERDANT_ALLOWED_ORIGINS` - Comma-separated CORS origins (default: permissive)
//! - `VERDANT_DEV_AUTH` - Enable development auth strategies (default: false;
//!   only honored by builds with the `dev-auth` feature)
//! - `IDENTITY_PROJECT_ID` - Identity provider project; absent disables federated login
//! - `IDENTITY_SERVER_KEY` - Identity provider server key (required with project ID)
//! - `IDENTITY_API_BASE` - Identity provider endpoint override (default: Google
//!   Identity Toolkit v1)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_IDENTITY_API_BASE: &str = "https://identitytoolkit.googleapis.com/v1";

/// Keys whose per-character entropy falls below this are almost certainly
/// typed by hand, not issued by the provider.
const SECRET_MIN_ENTROPY: f64 = 3.3;

/// Substrings that mark a copy-pasted sample value rather than a real key.
const SECRET_PLACEHOLDER_MARKERS: &[&str] = &[
    "your-", "changeme", "replace", "placeholder", "example", "secret", "password", "xxx",
    "todo", "fixme", "insert", "enter-", "put-your", "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `SQLite` database connection URL
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL the server is reachable at
    pub base_url: String,
    /// Explicit CORS origins; empty means permissive
    pub allowed_origins: Vec<String>,
    /// Identity provider configuration; `None` disables federated login
    pub identity: Option<IdentityConfig>,
    /// Whether development auth strategies are honored at runtime
    pub dev_auth: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Identity provider connection settings.
///
/// Implements `Debug` manually to redact the server key.
#[derive(Clone)]
pub struct IdentityConfig {
    /// Provider project identifier
    pub project_id: String,
    /// REST endpoint base (overridable for local stubs)
    pub api_base: String,
    /// Server-side API key
    pub server_key: SecretString,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("project_id", &self.project_id)
            .field("api_base", &self.api_base)
            .field("server_key", &"[REDACTED]")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from the environment, reading `.env` first when
    /// one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required variable is absent, a value
    /// fails to parse, or the identity server key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("VERDANT_DATABASE_URL")?;
        let host = get_env_or_default("VERDANT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("VERDANT_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("VERDANT_PORT", "4000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("VERDANT_PORT".to_string(), e.to_string()))?;
        let base_url = validate_base_url(&get_env_or_default(
            "VERDANT_BASE_URL",
            "http://localhost:4000",
        ))?;
        let allowed_origins = get_optional_env("VERDANT_ALLOWED_ORIGINS")
            .map(|raw| parse_origin_list(&raw))
            .unwrap_or_default();
        let identity = IdentityConfig::from_env()?;
        let dev_auth = get_env_flag("VERDANT_DEV_AUTH");
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            allowed_origins,
            identity,
            dev_auth,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl IdentityConfig {
    /// Loads the provider settings, treating an absent project ID as
    /// "federated login disabled" rather than an error.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(project_id) = get_optional_env("IDENTITY_PROJECT_ID") else {
            return Ok(None);
        };
        let server_key = get_validated_secret("IDENTITY_SERVER_KEY")?;
        let api_base = get_env_or_default("IDENTITY_API_BASE", DEFAULT_IDENTITY_API_BASE);
        Ok(Some(Self {
            project_id,
            api_base,
            server_key,
        }))
    }
}

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// The app-specific database variable wins; the generic `DATABASE_URL`
/// (which sqlx tooling reads) is accepted as a fallback.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a boolean flag from the environment ("1", "true", "yes" enable it).
fn get_env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Split a comma-separated origin list, dropping empty entries.
fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Validate the public base URL and strip any trailing slash so paths can
/// be appended with a plain `format!`.
fn validate_base_url(raw: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("VERDANT_BASE_URL".to_string(), e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "VERDANT_BASE_URL".to_string(),
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

/// Shannon entropy of the string, in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
    }

    #[allow(clippy::cast_precision_loss)] // secrets are far shorter than 2^52
    let total = s.chars().count() as f64;
    counts
        .into_values()
        .map(|count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Refuse secrets that look like sample values or hand-typed strings.
///
/// Booting with a placeholder key silently breaks federated login much
/// later, at the first bearer-token request; failing at startup instead
/// points straight at the misconfigured variable.
fn reject_weak_secret(key: &str, value: &str) -> Result<(), ConfigError> {
    let lowered = value.to_lowercase();
    if let Some(marker) = SECRET_PLACEHOLDER_MARKERS
        .iter()
        .find(|marker| lowered.contains(*marker))
    {
        return Err(ConfigError::InsecureSecret(
            key.to_string(),
            format!("looks like a placeholder (contains '{marker}')"),
        ));
    }

    let entropy = shannon_entropy(value);
    if entropy < SECRET_MIN_ENTROPY {
        return Err(ConfigError::InsecureSecret(
            key.to_string(),
            format!(
                "entropy {entropy:.2} bits/char is below {SECRET_MIN_ENTROPY}; use the key issued by the provider"
            ),
        ));
    }

    Ok(())
}

/// Load a secret from the environment, refusing weak values.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    reject_weak_secret(key, &value)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            database_url: SecretString::from("sqlite://test.db"),
            host: "127.0.0.1".parse().unwrap(),
            port: 4000,
            base_url: "http://localhost:4000".to_string(),
            allowed_origins: Vec::new(),
            identity: None,
            dev_auth: false,
            sentry_dsn: None,
        }
    }

    #[test]
    fn test_shannon_entropy_extremes() {
        assert!(shannon_entropy("").abs() < f64::EPSILON);
        assert!(shannon_entropy("aaaaaaa").abs() < f64::EPSILON);
        // Two equally likely symbols carry exactly one bit each.
        assert!((shannon_entropy("abab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > SECRET_MIN_ENTROPY);
    }

    #[test]
    fn test_reject_weak_secret_placeholders() {
        for value in ["your-api-key-here", "changeme123", "sample-SECRET-key"] {
            assert!(
                matches!(
                    reject_weak_secret("IDENTITY_SERVER_KEY", value),
                    Err(ConfigError::InsecureSecret(_, _))
                ),
                "accepted {value}"
            );
        }
    }

    #[test]
    fn test_reject_weak_secret_low_entropy() {
        assert!(reject_weak_secret("IDENTITY_SERVER_KEY", "aaaaaaaaaaaaaaaaaaaa").is_err());
    }

    #[test]
    fn test_reject_weak_secret_accepts_provider_shaped_key() {
        assert!(reject_weak_secret("IDENTITY_SERVER_KEY", "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6").is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 4000);
    }

    #[test]
    fn test_secure_cookies_follows_base_url_scheme() {
        let mut config = test_config();
        assert!(!config.secure_cookies());
        config.base_url = "https://verdantmarket.dev".to_string();
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_parse_origin_list() {
        let origins = parse_origin_list("https://a.test, https://b.test ,,");
        assert_eq!(origins, vec!["https://a.test", "https://b.test"]);
    }

    #[test]
    fn test_validate_base_url_strips_trailing_slash() {
        let base = validate_base_url("https://verdantmarket.dev/").unwrap();
        assert_eq!(base, "https://verdantmarket.dev");
    }

    #[test]
    fn test_validate_base_url_rejects_garbage() {
        assert!(validate_base_url("not a url").is_err());
        assert!(validate_base_url("ftp://verdantmarket.dev").is_err());
    }

    #[test]
    fn test_identity_config_debug_redacts_server_key() {
        let config = IdentityConfig {
            project_id: "verdant-prod".to_string(),
            api_base: DEFAULT_IDENTITY_API_BASE.to_string(),
            server_key: SecretString::from("super_secret_server_key"),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("verdant-prod"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_server_key"));
    }
}
