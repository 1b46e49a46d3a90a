//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `FIREBASE_API_KEY` - Web API key of the Firebase project (firebase backend)
//! - `FIREBASE_PROJECT_ID` - Firebase project ID (firebase backend)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BACKEND` - `firebase` or `memory` (default: firebase)
//! - `STOREFRONT_SESSION_IDLE_SECS` - Idle time before a visitor's store is
//!   dropped (default: 1800)
//! - `FIREBASE_AUTH_EMULATOR_HOST` - `host:port` of the Auth emulator
//! - `FIREBASE_FIRESTORE_EMULATOR_HOST` - `host:port` of the Firestore emulator
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
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

/// Which backend serves identity and documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Firebase,
    /// In-process accounts and documents, seeded with the demo catalog.
    Memory,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "firebase" => Ok(Self::Firebase),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected 'firebase' or 'memory', got '{other}'")),
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    pub backend: BackendKind,
    /// How long an idle visitor keeps their store and running effect handlers
    pub session_idle: Duration,
    /// Present when `backend` is [`BackendKind::Firebase`]
    pub firebase: Option<FirebaseConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

/// Firebase project configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct FirebaseConfig {
    pub api_key: SecretString,
    pub project_id: String,
    pub auth_emulator_host: Option<String>,
    pub firestore_emulator_host: Option<String>,
    /// Continue URI sent with IdP sign-ins (the storefront's base URL)
    pub request_uri: String,
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("api_key", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("auth_emulator_host", &self.auth_emulator_host)
            .field("firestore_emulator_host", &self.firestore_emulator_host)
            .field("request_uri", &self.request_uri)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_vars(&|key| std::env::var(key).ok())
    }

    /// Build the configuration from any variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_vars(vars: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(vars);

        let host = env.parse_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = env.parse_or_default::<u16>("STOREFRONT_PORT", "3000")?;
        let base_url = env.required("STOREFRONT_BASE_URL")?;
        let backend = env.parse_or_default::<BackendKind>("STOREFRONT_BACKEND", "firebase")?;
        let session_idle = Duration::from_secs(
            env.parse_or_default::<u64>("STOREFRONT_SESSION_IDLE_SECS", "1800")?,
        );

        let firebase = match backend {
            BackendKind::Firebase => Some(FirebaseConfig::from_env(&env, &base_url)?),
            BackendKind::Memory => None,
        };

        Ok(Self {
            host,
            port,
            base_url,
            backend,
            session_idle,
            firebase,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl FirebaseConfig {
    fn from_env(env: &Env<'_>, base_url: &str) -> Result<Self, ConfigError> {
        let auth_emulator_host = env.optional("FIREBASE_AUTH_EMULATOR_HOST");
        let firestore_emulator_host = env.optional("FIREBASE_FIRESTORE_EMULATOR_HOST");

        // The emulators accept any key.
        let api_key = if auth_emulator_host.is_some() {
            SecretString::from(env.required("FIREBASE_API_KEY")?)
        } else {
            env.validated_secret("FIREBASE_API_KEY")?
        };

        Ok(Self {
            api_key,
            project_id: env.required("FIREBASE_PROJECT_ID")?,
            auth_emulator_host,
            firestore_emulator_host,
            request_uri: base_url.to_string(),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable; empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn parse_or_default<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .as_deref()
            .unwrap_or(default)
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = SecretString::from(self.required(key)?);
        validate_secret_strength(value.expose_secret(), key)?;
        Ok(value)
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const API_KEY: &str = "AIzaSyB4kQm7Xw2Lr9Tn1Vc8Hd3Jf6Gp0Zs5Ue";

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy(API_KEY) > MIN_ENTROPY_BITS_PER_CHAR);
    }

    #[test]
    fn test_validate_secret_strength() {
        assert!(matches!(
            validate_secret_strength("your-api-key-here", "FIREBASE_API_KEY"),
            Err(ConfigError::InsecureSecret(_, _))
        ));
        assert!(validate_secret_strength("changeme123", "FIREBASE_API_KEY").is_err());
        assert!(validate_secret_strength(&"a".repeat(39), "FIREBASE_API_KEY").is_err());
        assert!(validate_secret_strength(API_KEY, "FIREBASE_API_KEY").is_ok());
    }

    #[test]
    fn test_memory_backend_defaults() {
        let config = StorefrontConfig::from_vars(&vars(&[
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("STOREFRONT_BACKEND", "memory"),
        ]))
        .unwrap();

        assert_eq!(config.backend, BackendKind::Memory);
        assert!(config.firebase.is_none());
        assert_eq!(config.session_idle, Duration::from_secs(1800));
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_firebase_backend() {
        let config = StorefrontConfig::from_vars(&vars(&[
            ("STOREFRONT_BASE_URL", "https://shop.example.com"),
            ("STOREFRONT_PORT", "8080"),
            ("FIREBASE_API_KEY", API_KEY),
            ("FIREBASE_PROJECT_ID", "crwn-clothing-db"),
        ]))
        .unwrap();

        assert_eq!(config.backend, BackendKind::Firebase);
        assert_eq!(config.port, 8080);
        let firebase = config.firebase.unwrap();
        assert_eq!(firebase.project_id, "crwn-clothing-db");
        assert_eq!(firebase.request_uri, "https://shop.example.com");
        assert!(firebase.auth_emulator_host.is_none());
        assert!(firebase.firestore_emulator_host.is_none());
    }

    #[test]
    fn test_missing_and_invalid_vars() {
        assert!(matches!(
            StorefrontConfig::from_vars(&vars(&[])),
            Err(ConfigError::MissingEnvVar(key)) if key == "STOREFRONT_BASE_URL"
        ));
        assert!(matches!(
            StorefrontConfig::from_vars(&vars(&[
                ("STOREFRONT_BASE_URL", "http://localhost:3000"),
                ("STOREFRONT_BACKEND", "postgres"),
            ])),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "STOREFRONT_BACKEND"
        ));
        assert!(matches!(
            StorefrontConfig::from_vars(&vars(&[("STOREFRONT_BASE_URL", "http://localhost:3000")])),
            Err(ConfigError::MissingEnvVar(key)) if key == "FIREBASE_API_KEY"
        ));
    }

    #[test]
    fn test_emulator_accepts_any_key() {
        let config = StorefrontConfig::from_vars(&vars(&[
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("FIREBASE_API_KEY", "fake-api-key"),
            ("FIREBASE_PROJECT_ID", "demo-crwn"),
            ("FIREBASE_AUTH_EMULATOR_HOST", "127.0.0.1:9099"),
        ]))
        .unwrap();
        assert_eq!(
            config.firebase.unwrap().auth_emulator_host.as_deref(),
            Some("127.0.0.1:9099")
        );
    }

    #[test]
    fn test_firebase_config_debug_redacts_key() {
        let config = FirebaseConfig {
            api_key: SecretString::from(API_KEY),
            project_id: "crwn-clothing-db".to_string(),
            auth_emulator_host: None,
            firestore_emulator_host: None,
            request_uri: "http://localhost:3000".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("crwn-clothing-db"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(API_KEY));
    }
}
