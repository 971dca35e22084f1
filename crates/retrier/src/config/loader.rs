//! Configuration loader with precedence
//!
//! Loads a [`RetryConfig`] from the following sources (low to high):
//! 1. Built-in defaults
//! 2. A YAML or JSON file, chosen by extension
//! 3. Environment variables (`RETRIER_*` prefix by default)
//! 4. Caller overrides, applied to the returned value

use std::env;
use std::fs;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use super::{DelayKind, RetryConfig};
use crate::error::{Error, Result};

const DEFAULT_ENV_PREFIX: &str = "RETRIER";

/// Resolves a [`RetryConfig`] from defaults, a file and the environment
///
/// # Example
///
/// ```rust,no_run
/// use retrier::ConfigLoader;
///
/// # fn example() -> retrier::Result<()> {
/// let mut config = ConfigLoader::new().with_file("retry.yaml").load()?;
/// config.max_retries = 5;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<Utf8PathBuf>,
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Load this file on top of the defaults; it must exist
    pub fn with_file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Read `<PREFIX>_MAX_RETRIES` etc. instead of `RETRIER_*`
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn file(&self) -> Option<&Utf8Path> {
        self.file.as_deref()
    }

    /// Load and validate the configuration
    pub fn load(&self) -> Result<RetryConfig> {
        let mut config = match &self.file {
            Some(path) => Self::load_file(path)?,
            None => RetryConfig::default(),
        };

        self.apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    fn load_file(path: &Utf8Path) -> Result<RetryConfig> {
        if !path.exists() {
            return Err(Error::config_not_found(path.as_str()));
        }

        let content = fs::read_to_string(path)?;
        let config = match path.extension() {
            Some("json") => serde_json::from_str(&content)?,
            _ => serde_yaml_ng::from_str(&content)?,
        };

        debug!(path = %path, "loaded retry configuration file");
        Ok(config)
    }

    fn var(&self, name: &str) -> Option<(String, String)> {
        let key = format!("{}_{}", self.env_prefix, name);
        env::var(&key).ok().map(|value| (key, value))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut RetryConfig) -> Result<()> {
        if let Some((key, val)) = self.var("MAX_RETRIES") {
            config.max_retries = parse_number(&key, &val)?;
        }

        if let Some((_, val)) = self.var("STRATEGY") {
            config.strategy = DelayKind::from_str(&val)?;
        }

        if let Some((key, val)) = self.var("INITIAL_DELAY_MS") {
            config.initial_delay_ms = parse_number(&key, &val)?;
        }

        if let Some((key, val)) = self.var("UNIT_MS") {
            config.unit_ms = parse_number(&key, &val)?;
        }

        if let Some((key, val)) = self.var("MAX_DELAY_MS") {
            config.max_delay_ms = match val.trim() {
                "" | "none" => None,
                _ => Some(parse_number(&key, &val)?),
            };
        }

        if let Some((key, val)) = self.var("RETRY_STATUSES") {
            config.retry_statuses = split_list(&val)
                .map(|code| parse_number(&key, code))
                .collect::<Result<_>>()?;
        }

        if let Some((_, val)) = self.var("RETRY_METHODS") {
            config.retry_methods = split_list(&val).map(str::to_ascii_uppercase).collect();
        }

        if let Some((key, val)) = self.var("RETRY_TEMPORARY_ERRORS") {
            config.retry_temporary_errors = parse_bool(&key, &val)?;
        }

        if let Some((key, val)) = self.var("PREVENT_RETRY_WITH_BODY") {
            config.prevent_retry_with_body = parse_bool(&key, &val)?;
        }

        if let Some((key, val)) = self.var("TIMEOUT_SECS") {
            config.timeout_secs = parse_number(&key, &val)?;
        }

        if let Some((_, val)) = self.var("USER_AGENT") {
            config.user_agent = val;
        }

        Ok(())
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::invalid_config(format!("{} must be a valid number", key)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::invalid_config(format!("{} must be true or false", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "RETRIER_MAX_RETRIES",
        "RETRIER_STRATEGY",
        "RETRIER_MAX_DELAY_MS",
        "RETRIER_RETRY_STATUSES",
        "RETRIER_RETRY_METHODS",
        "RETRIER_PREVENT_RETRY_WITH_BODY",
        "RETRIER_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    fn write_config(dir: &TempDir, name: &str, content: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    #[serial]
    fn test_load_defaults() {
        clear_env();
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, RetryConfig::default());
    }

    #[test]
    #[serial]
    fn test_load_yaml_file() {
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, "retry.yaml", "max-retries: 7\nstrategy: none\n");

        let config = ConfigLoader::new().with_file(&path).load().unwrap();

        assert_eq!(config.max_retries, 7);
        assert_eq!(config.strategy, DelayKind::None);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    #[serial]
    fn test_load_json_file() {
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, "retry.json", r#"{"retry-statuses": [502, 503]}"#);

        let config = ConfigLoader::new().with_file(path).load().unwrap();

        assert_eq!(config.retry_statuses, vec![502, 503]);
    }

    #[test]
    #[serial]
    fn test_missing_file() {
        clear_env();
        let err = ConfigLoader::new()
            .with_file("/nonexistent/retry.yaml")
            .load()
            .unwrap_err();

        assert!(
            matches!(err, Error::ConfigNotFound { ref path } if path == "/nonexistent/retry.yaml")
        );
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        let temp_dir = TempDir::new().unwrap();
        let path = write_config(&temp_dir, "retry.yaml", "max-retries: 7\ntimeout-secs: 5\n");

        env::set_var("RETRIER_MAX_RETRIES", "2");
        env::set_var("RETRIER_STRATEGY", "linear");
        env::set_var("RETRIER_MAX_DELAY_MS", "none");
        env::set_var("RETRIER_RETRY_STATUSES", "429, 503");
        env::set_var("RETRIER_RETRY_METHODS", "get,put");
        env::set_var("RETRIER_PREVENT_RETRY_WITH_BODY", "yes");

        let config = ConfigLoader::new().with_file(&path).load();
        clear_env();
        let config = config.unwrap();

        assert_eq!(config.max_retries, 2);
        assert_eq!(config.strategy, DelayKind::Linear);
        assert_eq!(config.max_delay_ms, None);
        assert_eq!(config.retry_statuses, vec![429, 503]);
        assert_eq!(
            config.retry_methods,
            vec!["GET".to_string(), "PUT".to_string()]
        );
        assert!(config.prevent_retry_with_body);
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    #[serial]
    fn test_invalid_env_value() {
        clear_env();
        env::set_var("RETRIER_TIMEOUT_SECS", "soon");

        let result = ConfigLoader::new().load();
        clear_env();

        let err = result.unwrap_err();
        assert!(err
            .to_string()
            .contains("RETRIER_TIMEOUT_SECS must be a valid number"));
    }

    #[test]
    #[serial]
    fn test_custom_env_prefix() {
        clear_env();
        env::set_var("MYAPP_MAX_RETRIES", "9");
        env::set_var("RETRIER_MAX_RETRIES", "1");

        let result = ConfigLoader::new().with_env_prefix("MYAPP").load();
        env::remove_var("MYAPP_MAX_RETRIES");
        clear_env();

        assert_eq!(result.unwrap().max_retries, 9);
    }
}
