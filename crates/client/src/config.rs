//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SOUQ_SUPABASE_URL` - Project URL of the remote service (e.g., https://abc.supabase.co)
//! - `SOUQ_SUPABASE_ANON_KEY` - Public API key sent on every request
//!
//! ## Optional
//! - `SOUQ_ACCESS_TOKEN` - Session access token of the signed-in user
//! - `SOUQ_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `SOUQ_COMMENT_CACHE_CAPACITY` - Max cached comment threads (default: 500)
//! - `SOUQ_NOTIFY_SUCCESS_MS` - Success message lifetime (default: 3000)
//! - `SOUQ_NOTIFY_ERROR_MS` - Error message lifetime (default: 4000)

use std::collections::HashMap;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
/// Comment threads kept in memory when not configured.
pub const DEFAULT_COMMENT_CACHE_CAPACITY: u64 = 500;
const DEFAULT_NOTIFY_SUCCESS_MS: u64 = 3000;
const DEFAULT_NOTIFY_ERROR_MS: u64 = 4000;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "fixme",
    "insert-",
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

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Remote service connection settings
    pub remote: RemoteConfig,
    /// Maximum number of comment threads kept in memory
    pub comment_cache_capacity: u64,
    /// How long notifications stay visible
    pub notifications: NotificationConfig,
}

/// Remote data service configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct RemoteConfig {
    /// Project base URL
    pub base_url: Url,
    /// Public API key
    pub anon_key: SecretString,
    /// Access token of the signed-in user, if any
    pub access_token: Option<SecretString>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Auto-dismiss intervals per notification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationConfig {
    pub success_ttl: Duration,
    pub error_ttl: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            success_ttl: Duration::from_millis(DEFAULT_NOTIFY_SUCCESS_MS),
            error_ttl: Duration::from_millis(DEFAULT_NOTIFY_ERROR_MS),
        }
    }
}

impl ClientConfig {
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

        let remote = RemoteConfig::from_env()?;
        let comment_cache_capacity =
            parse_nonzero_env_or_default("SOUQ_COMMENT_CACHE_CAPACITY", DEFAULT_COMMENT_CACHE_CAPACITY)?;
        let notifications = NotificationConfig {
            success_ttl: Duration::from_millis(parse_env_or_default(
                "SOUQ_NOTIFY_SUCCESS_MS",
                DEFAULT_NOTIFY_SUCCESS_MS,
            )?),
            error_ttl: Duration::from_millis(parse_env_or_default(
                "SOUQ_NOTIFY_ERROR_MS",
                DEFAULT_NOTIFY_ERROR_MS,
            )?),
        };

        Ok(Self {
            remote,
            comment_cache_capacity,
            notifications,
        })
    }
}

impl RemoteConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("SOUQ_SUPABASE_URL")?;
        let base_url = Url::parse(&raw_url).map_err(|e| {
            ConfigError::InvalidEnvVar("SOUQ_SUPABASE_URL".to_string(), e.to_string())
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "SOUQ_SUPABASE_URL".to_string(),
                format!("unsupported scheme '{}'", base_url.scheme()),
            ));
        }

        Ok(Self {
            base_url,
            anon_key: get_validated_secret("SOUQ_SUPABASE_ANON_KEY")?,
            access_token: get_optional_env("SOUQ_ACCESS_TOKEN").map(SecretString::from),
            request_timeout: Duration::from_secs(parse_nonzero_env_or_default(
                "SOUQ_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |raw| parse_u64(key, &raw))
}

/// Like [`parse_env_or_default`], but rejects 0.
fn parse_nonzero_env_or_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    require_nonzero(key, parse_env_or_default(key, default)?)
}

fn require_nonzero(key: &str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than 0".to_string(),
        ));
    }
    Ok(value)
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
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
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // API keys are signed tokens and have high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the key from the project settings."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
