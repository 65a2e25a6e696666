//! Engine configuration.
//!
//! All environment-derived settings are read exactly once, by
//! [`EngineConfig::from_env`], into an immutable struct that is passed by
//! reference into each component's constructor. Nothing in the engine
//! consults the process environment after construction.

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::crypto::SecretCipher;
use crate::error::{EngineError, EngineResult};
use crate::retry::RetryPolicy;

/// OAuth 2.0 client credentials for Google API access.
///
/// Users must provide their own OAuth client ID and secret, as Google
/// requires registered applications for API access. The redirect URI must
/// match one registered for the client (e.g.
/// `http://localhost:3000/oauth2/callback`).
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
    /// The registered redirect URI the consent flow returns to.
    pub redirect_uri: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Validates that the credentials appear to be correctly formatted.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        if self.redirect_uri.is_empty() {
            return Err("redirect_uri is required");
        }
        Ok(())
    }
}

/// Configuration for the scheduling engine.
///
/// Constructed once at process start ([`from_env`](Self::from_env) or the
/// builder methods) and immutable thereafter.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// OAuth client credentials.
    pub credentials: OAuthCredentials,

    /// OAuth scopes requested during authorization.
    pub scopes: Vec<String>,

    /// Directory holding the credential and preference record files.
    pub data_dir: PathBuf,

    /// 32-byte key for the credential cipher.
    pub encryption_key: Vec<u8>,

    /// Process-wide refresh-token override.
    ///
    /// When set, credential resolution uses this token for every user
    /// instead of the store.
    pub refresh_token_override: Option<String>,

    /// Request timeout for remote calls.
    pub timeout: Duration,

    /// Backoff policy applied to remote calendar calls.
    pub retry: RetryPolicy,
}

impl EngineConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default OAuth scopes: read calendars, manage events.
    pub const DEFAULT_SCOPES: [&'static str; 2] = [
        "https://www.googleapis.com/auth/calendar.readonly",
        "https://www.googleapis.com/auth/calendar.events",
    ];

    /// Creates a new configuration with the given credentials and cipher key.
    pub fn new(credentials: OAuthCredentials, encryption_key: Vec<u8>) -> Self {
        Self {
            credentials,
            scopes: Self::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            data_dir: Self::default_data_dir(),
            encryption_key,
            refresh_token_override: None,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }

    /// Returns the default data directory
    /// (`~/.local/share/meetslot` on Linux, falling back to `./data`).
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|dir| dir.join("meetslot"))
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    /// Builds the configuration from the process environment.
    ///
    /// Required: `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`,
    /// `GOOGLE_REDIRECT_URI`, `ENCRYPTION_KEY` (base64-encoded 32 bytes).
    /// Optional: `GOOGLE_REFRESH_TOKEN` (process-wide override),
    /// `MEETSLOT_DATA_DIR`.
    pub fn from_env() -> EngineResult<Self> {
        let credentials = OAuthCredentials::new(
            require_env("GOOGLE_CLIENT_ID")?,
            require_env("GOOGLE_CLIENT_SECRET")?,
            require_env("GOOGLE_REDIRECT_URI")?,
        );

        let encryption_key = decode_key(&require_env("ENCRYPTION_KEY")?)?;

        let mut config = Self::new(credentials, encryption_key);
        if let Ok(token) = std::env::var("GOOGLE_REFRESH_TOKEN") {
            if !token.is_empty() {
                config.refresh_token_override = Some(token);
            }
        }
        if let Ok(dir) = std::env::var("MEETSLOT_DATA_DIR") {
            if !dir.is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the process-wide refresh-token override.
    pub fn with_refresh_token_override(mut self, token: impl Into<String>) -> Self {
        self.refresh_token_override = Some(token.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        self.credentials
            .validate()
            .map_err(|e| EngineError::configuration(format!("invalid credentials: {}", e)))?;

        if self.scopes.is_empty() {
            return Err(EngineError::configuration(
                "at least one OAuth scope is required",
            ));
        }

        if self.encryption_key.len() != SecretCipher::KEY_LEN {
            return Err(EngineError::configuration(format!(
                "encryption key must be {} bytes, got {}",
                SecretCipher::KEY_LEN,
                self.encryption_key.len()
            )));
        }

        Ok(())
    }

    /// Path of the credential record file.
    pub fn credential_path(&self) -> PathBuf {
        self.data_dir.join("credentials.json")
    }

    /// Path of the preference record file.
    pub fn preference_path(&self) -> PathBuf {
        self.data_dir.join("preferences.json")
    }

    /// The data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn require_env(name: &str) -> EngineResult<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(EngineError::configuration(format!("{} is required", name))),
    }
}

fn decode_key(encoded: &str) -> EngineResult<Vec<u8>> {
    let key = BASE64
        .decode(encoded.trim())
        .map_err(|e| EngineError::configuration(format!("ENCRYPTION_KEY is not valid base64: {}", e)))?;
    if key.len() != SecretCipher::KEY_LEN {
        return Err(EngineError::configuration(format!(
            "ENCRYPTION_KEY must decode to {} bytes, got {}",
            SecretCipher::KEY_LEN,
            key.len()
        )));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineErrorCode;

    fn test_credentials() -> OAuthCredentials {
        OAuthCredentials::new(
            "test-client.apps.googleusercontent.com",
            "test-secret",
            "http://localhost:3000/oauth2/callback",
        )
    }

    #[test]
    fn credentials_validation() {
        assert!(test_credentials().validate().is_ok());

        let empty_id = OAuthCredentials::new("", "secret", "http://localhost/cb");
        assert!(empty_id.validate().is_err());

        let empty_secret = OAuthCredentials::new("id", "", "http://localhost/cb");
        assert!(empty_secret.validate().is_err());

        let empty_redirect = OAuthCredentials::new("id", "secret", "");
        assert!(empty_redirect.validate().is_err());
    }

    #[test]
    fn config_defaults() {
        let config = EngineConfig::new(test_credentials(), vec![0u8; 32]);
        assert_eq!(config.scopes.len(), 2);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.refresh_token_override.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_short_key() {
        let config = EngineConfig::new(test_credentials(), vec![0u8; 16]);
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), EngineErrorCode::ConfigurationError);
    }

    #[test]
    fn config_rejects_empty_scopes() {
        let config = EngineConfig::new(test_credentials(), vec![0u8; 32]).with_scopes(vec![]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn decode_key_validates_length() {
        let ok = decode_key(&BASE64.encode([7u8; 32])).unwrap();
        assert_eq!(ok.len(), 32);

        assert!(decode_key(&BASE64.encode([7u8; 16])).is_err());
        assert!(decode_key("not base64!!!").is_err());
    }

    #[test]
    fn record_file_paths() {
        let config = EngineConfig::new(test_credentials(), vec![0u8; 32]).with_data_dir("/tmp/ms");
        assert_eq!(config.credential_path(), PathBuf::from("/tmp/ms/credentials.json"));
        assert_eq!(config.preference_path(), PathBuf::from("/tmp/ms/preferences.json"));
    }
}
