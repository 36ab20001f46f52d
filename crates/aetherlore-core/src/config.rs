//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/aetherlore/config.toml)
//! 3. Environment variables (AETHERLORE_* prefix)
//!
//! Environment variables take precedence over config file values.
//!
//! This is machine-level configuration (where data lives, API keys, logging).
//! User-facing preferences such as the theme and generation backend are part
//! of the `AppSettings` record instead.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable prefix
const ENV_PREFIX: &str = "AETHERLORE";

/// Conventional variable read when no AetherLore-specific key is set
const GEMINI_KEY_FALLBACK_ENV: &str = "GEMINI_API_KEY";

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the lorebook and settings records
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// API key for the Gemini backend
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// Log file (logs go to stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Quiet period before a staged edit is committed
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            gemini_api_key: None,
            log_file: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (AETHERLORE_DATA_DIR, AETHERLORE_GEMINI_API_KEY, ...)
    /// 2. Config file (~/.config/aetherlore/config.toml or AETHERLORE_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // AETHERLORE_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // AETHERLORE_GEMINI_API_KEY, then GEMINI_API_KEY if nothing is set yet
        if let Ok(val) = std::env::var(format!("{}_GEMINI_API_KEY", ENV_PREFIX)) {
            self.gemini_api_key = if val.is_empty() { None } else { Some(val) };
        } else if self.gemini_api_key.is_none() {
            if let Ok(val) = std::env::var(GEMINI_KEY_FALLBACK_ENV) {
                self.gemini_api_key = Some(val).filter(|v| !v.is_empty());
            }
        }

        // AETHERLORE_LOG_FILE
        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        // AETHERLORE_DEBOUNCE_MS (ignored when not a number)
        if let Ok(val) = std::env::var(format!("{}_DEBOUNCE_MS", ENV_PREFIX)) {
            if let Ok(ms) = val.trim().parse() {
                self.debounce_ms = ms;
            }
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with AETHERLORE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aetherlore")
            .join("config.toml")
    }

    /// Quiet period used to debounce edits
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aetherlore")
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Serializes tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "AETHERLORE_DATA_DIR",
        "AETHERLORE_GEMINI_API_KEY",
        "AETHERLORE_LOG_FILE",
        "AETHERLORE_DEBOUNCE_MS",
        "GEMINI_API_KEY",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.gemini_api_key.is_none());
        assert!(config.log_file.is_none());
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert!(config.data_dir.ends_with("aetherlore"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("AETHERLORE_DATA_DIR", "/tmp/aetherlore-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/aetherlore-test"));
    }

    #[test]
    fn test_env_override_gemini_key() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("GEMINI_API_KEY", "fallback-key");
        config.apply_env_overrides();
        assert_eq!(config.gemini_api_key.as_deref(), Some("fallback-key"));

        // The prefixed variable wins
        env::set_var("AETHERLORE_GEMINI_API_KEY", "primary-key");
        config.apply_env_overrides();
        assert_eq!(config.gemini_api_key.as_deref(), Some("primary-key"));

        // Empty string clears it
        env::set_var("AETHERLORE_GEMINI_API_KEY", "");
        config.apply_env_overrides();
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_env_fallback_does_not_replace_file_key() {
        let _guard = EnvGuard::new(ENV_VARS);

        env::set_var("GEMINI_API_KEY", "from-env");
        let config = Config::load_from_str(r#"gemini_api_key = "from-file""#).unwrap();
        assert_eq!(config.gemini_api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_env_override_debounce() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("AETHERLORE_DEBOUNCE_MS", "250");
        config.apply_env_overrides();
        assert_eq!(config.debounce_ms, 250);

        env::set_var("AETHERLORE_DEBOUNCE_MS", "soon");
        config.apply_env_overrides();
        assert_eq!(config.debounce_ms, 250);
    }

    #[test]
    fn test_serialization() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config {
            data_dir: PathBuf::from("/data/aetherlore"),
            gemini_api_key: Some("key".to_string()),
            log_file: None,
            debounce_ms: 750,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("gemini_api_key"));
        assert!(toml_str.contains("debounce_ms"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.data_dir, config.data_dir);
        assert_eq!(parsed.gemini_api_key, config.gemini_api_key);
        assert_eq!(parsed.debounce_ms, 750);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            debounce_ms = 1000
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.debounce_ms, 1000);
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        env::set_var("AETHERLORE_DATA_DIR", temp_dir.path().join("data"));

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();

        assert_eq!(config.debounce_ms, 500);
        assert!(config.data_dir.exists());
    }

    #[test]
    fn test_save_to_path_round_trip() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            log_file: Some(temp_dir.path().join("lore.log")),
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.data_dir, config.data_dir);
        assert_eq!(loaded.log_file, config.log_file);
    }
}
