//! Application configuration.
//!
//! Aggregates the store, cache, auth and notes sections into a single
//! Config struct that can be loaded from YAML files or environment variables.

mod store;

pub use store::{PostgresConfig, RestStoreConfig, SqliteConfig, StoreConfig, StoreType};

use std::time::Duration;

use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "KAMHUB_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "KAMHUB";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "KAMHUB_LOG";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store backend configuration.
    pub store: StoreConfig,
    /// Query cache configuration.
    pub cache: CacheConfig,
    /// Sign-in email policy.
    pub auth: AuthConfig,
    /// Local restaurant notes.
    pub notes: NotesConfig,
}

/// Query cache configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries older than this are refetched. Unset means entries stay fresh
    /// until invalidated.
    pub stale_after_secs: Option<u64>,
}

impl CacheConfig {
    pub fn stale_after(&self) -> Option<Duration> {
        self.stale_after_secs.map(Duration::from_secs)
    }
}

/// Sign-in email policy configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Organization email domain, without the `@`.
    pub allowed_domain: String,
    /// Admit only the organization domain (production).
    pub restrict_domain: bool,
    /// Extra emails admitted when the domain is not restricted.
    pub allowed_test_emails: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allowed_domain: "zomato.com".to_string(),
            restrict_domain: false,
            allowed_test_emails: Vec::new(),
        }
    }
}

/// Restaurant notes configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    /// JSON file holding one note per restaurant id.
    pub path: String,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            path: "data/kamhub-notes.json".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.allowed_test_emails")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints the types cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.allowed_domain.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "auth.allowed_domain must not be empty".to_string(),
            ));
        }
        if self.notes.path.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "notes.path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Create config for testing: in-memory store, no staleness.
    pub fn for_test() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serial_test::serial;

    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.store.store_type, StoreType::Memory);
        assert_eq!(config.store.rest.timeout_secs, 30);
        assert!(config.cache.stale_after().is_none());
        assert!(!config.auth.restrict_domain);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "store:\n  type: rest\n  rest:\n    url: https://example.test\n    anon_key: k\ncache:\n  stale_after_secs: 60\nauth:\n  restrict_domain: true"
        )
        .unwrap();

        let config = Config::load(file.path().to_str()).unwrap();

        assert_eq!(config.store.store_type, StoreType::Rest);
        assert_eq!(config.store.rest.url, "https://example.test");
        assert_eq!(config.cache.stale_after(), Some(Duration::from_secs(60)));
        assert!(config.auth.restrict_domain);
        assert_eq!(config.auth.allowed_domain, "zomato.com");
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "store:\n  type: sqlite").unwrap();

        std::env::set_var("KAMHUB__STORE__SQLITE__PATH", "/tmp/override.db");
        let config = Config::load(file.path().to_str());
        std::env::remove_var("KAMHUB__STORE__SQLITE__PATH");
        let config = config.unwrap();

        assert_eq!(config.store.store_type, StoreType::Sqlite);
        assert_eq!(config.store.sqlite.path, "/tmp/override.db");
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_an_error() {
        let result = Config::load(Some("/nonexistent/kamhub.yaml"));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_validate_rejects_empty_domain() {
        let mut config = Config::default();
        config.auth.allowed_domain = " ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
