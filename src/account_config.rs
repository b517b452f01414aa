//! Account configuration: platform credentials and the bot's handle.

use crate::platform::Credentials;
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Environment variable prefix used by [`AccountConfig::from_env`].
const ENV_PREFIX: &str = "MARBLE_THREAD_";

/// Credentials and handle for the account that hosts the game thread.
#[derive(Clone, Getters, Deserialize)]
pub struct AccountConfig {
    /// API consumer key.
    consumer_key: String,

    /// API consumer secret.
    consumer_secret: String,

    /// User access token.
    access_token: String,

    /// User access token secret.
    access_token_secret: String,

    /// Handle of the account (with or without a leading `@`).
    account: String,
}

impl AccountConfig {
    /// Creates a configuration from explicit values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any value is empty.
    #[instrument(skip(consumer_key, consumer_secret, access_token, access_token_secret))]
    pub fn new(
        consumer_key: String,
        consumer_secret: String,
        access_token: String,
        access_token_secret: String,
        account: String,
    ) -> Result<Self, ConfigError> {
        Self {
            consumer_key,
            consumer_secret,
            access_token,
            access_token_secret,
            account,
        }
        .validated()
    }

    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading account config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        let config = config.validated()?;
        info!(account = %config.account, "Account config loaded");
        Ok(config)
    }

    /// Loads configuration from `MARBLE_THREAD_*` environment variables.
    #[instrument]
    pub fn from_env() -> Result<Self, ConfigError> {
        debug!("Loading account config from environment");
        Self::from_lookup(env_lookup)
    }

    /// Loads from `path` if it exists, otherwise from the environment.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_with(path.as_ref(), env_lookup)
    }

    /// Returns the account handle from `MARBLE_THREAD_ACCOUNT`, if set.
    ///
    /// Used when only the handle is needed, as in the console stand-in.
    pub fn account_from_env() -> Option<String> {
        Self::account_from_lookup(env_lookup)
    }

    fn account_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        lookup("ACCOUNT")
            .map(|account| account.trim().trim_start_matches('@').to_string())
            .filter(|account| !account.is_empty())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name).ok_or_else(|| {
                ConfigError::new(format!(
                    "{}{} environment variable not set",
                    ENV_PREFIX, name
                ))
            })
        };

        Self::new(
            var("CONSUMER_KEY")?,
            var("CONSUMER_SECRET")?,
            var("ACCESS_TOKEN")?,
            var("ACCESS_TOKEN_SECRET")?,
            var("ACCOUNT")?,
        )
    }

    fn load_with(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            info!(
                "Config file not found at {}, reading environment",
                path.display()
            );
            Self::from_lookup(lookup)
        }
    }

    /// Returns the credentials that sign requests for this account.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.consumer_key.clone(),
            self.consumer_secret.clone(),
            self.access_token.clone(),
            self.access_token_secret.clone(),
        )
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        self.account = self.account.trim().trim_start_matches('@').to_string();

        let fields = [
            ("consumer_key", &self.consumer_key),
            ("consumer_secret", &self.consumer_secret),
            ("access_token", &self.access_token),
            ("access_token_secret", &self.access_token_secret),
            ("account", &self.account),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::new(format!("{} must not be empty", name)));
        }
        Ok(self)
    }
}

/// Reads `MARBLE_THREAD_<name>` from the process environment.
fn env_lookup(name: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, name)).ok()
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &self.access_token)
            .field("access_token_secret", &"<redacted>")
            .field("account", &self.account)
            .finish()
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const ALL: [(&str, &str); 5] = [
        ("CONSUMER_KEY", "ck"),
        ("CONSUMER_SECRET", "cs"),
        ("ACCESS_TOKEN", "at"),
        ("ACCESS_TOKEN_SECRET", "ats"),
        ("ACCOUNT", "@marbles"),
    ];

    #[test]
    fn test_lookup_reads_all_five_variables() {
        let config = AccountConfig::from_lookup(vars(&ALL)).expect("Load failed");

        assert_eq!(config.consumer_key(), "ck");
        assert_eq!(config.consumer_secret(), "cs");
        assert_eq!(config.access_token(), "at");
        assert_eq!(config.access_token_secret(), "ats");
        assert_eq!(config.account(), "marbles");
    }

    #[test]
    fn test_lookup_names_missing_variable() {
        let partial: Vec<_> = ALL
            .iter()
            .copied()
            .filter(|(k, _)| *k != "ACCESS_TOKEN_SECRET")
            .collect();

        let err = AccountConfig::from_lookup(vars(&partial)).unwrap_err();

        assert_eq!(
            err.message,
            "MARBLE_THREAD_ACCESS_TOKEN_SECRET environment variable not set"
        );
    }

    #[test]
    fn test_lookup_rejects_empty_value() {
        let mut pairs = ALL.to_vec();
        pairs[0] = ("CONSUMER_KEY", "");

        let err = AccountConfig::from_lookup(vars(&pairs)).unwrap_err();

        assert_eq!(err.message, "consumer_key must not be empty");
    }

    #[test]
    fn test_load_falls_back_to_lookup_without_file() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let missing = dir.path().join("account.toml");

        let config = AccountConfig::load_with(&missing, vars(&ALL)).expect("Load failed");

        assert_eq!(config.account(), "marbles");
    }

    #[test]
    fn test_load_prefers_file_over_lookup() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("account.toml");
        std::fs::write(
            &path,
            "consumer_key = \"file-ck\"\nconsumer_secret = \"x\"\naccess_token = \"x\"\naccess_token_secret = \"x\"\naccount = \"from_file\"\n",
        )
        .expect("Failed to write TOML");

        let config = AccountConfig::load_with(&path, vars(&ALL)).expect("Load failed");

        assert_eq!(config.account(), "from_file");
        assert_eq!(config.consumer_key(), "file-ck");
    }

    #[test]
    fn test_account_lookup_normalises_handle() {
        assert_eq!(
            AccountConfig::account_from_lookup(vars(&[("ACCOUNT", " @marbles ")])),
            Some("marbles".to_string())
        );
        assert_eq!(AccountConfig::account_from_lookup(vars(&[("ACCOUNT", "@")])), None);
        assert_eq!(AccountConfig::account_from_lookup(vars(&[])), None);
    }
}
