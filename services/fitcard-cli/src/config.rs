//! Configuration types and loading
//!
//! Config precedence: env vars > config file > defaults. The config file
//! itself comes from `--config`, then `CONFIG_PATH`, then `fitcard.toml` in
//! the working directory. Only the implicit default file may be missing.

use auth_api::{DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use token_authenticator::MAX_RESPONSE_COUNT;

const DEFAULT_CONFIG_FILE: &str = "fitcard.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Backend connection settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Credential storage and refresh settings
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
    /// Failed attempts per request before giving up on refresh
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_token_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fitcard")
        .join("tokens.json")
}

fn default_max_attempts() -> usize {
    MAX_RESPONSE_COUNT
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl ApiConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.finish()
    }

    /// Built-in defaults with environment overrides applied.
    pub fn from_env() -> common::Result<Self> {
        Config::default().finish()
    }

    /// Find and load the configuration for this invocation.
    ///
    /// An explicitly named file (CLI arg or `CONFIG_PATH`) must exist; the
    /// implicit `fitcard.toml` falls back to defaults when absent.
    pub fn resolve(cli_path: Option<&str>) -> common::Result<(Self, Option<PathBuf>)> {
        let explicit = cli_path.is_some() || std::env::var_os("CONFIG_PATH").is_some();
        let path = Self::resolve_path(cli_path);
        if !explicit && !path.exists() {
            return Ok((Self::from_env()?, None));
        }
        let config = Self::load(&path)?;
        Ok((config, Some(path)))
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    fn finish(mut self) -> common::Result<Self> {
        if let Ok(url) = std::env::var("FITCARD_BASE_URL") {
            self.api.base_url = url;
        }
        if let Ok(path) = std::env::var("FITCARD_TOKEN_FILE") {
            self.auth.token_file = PathBuf::from(path);
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.connect_timeout_secs == 0 {
            return Err(common::Error::Config(
                "connect_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.auth.max_attempts == 0 {
            return Err(common::Error::Config(
                "max_attempts must be greater than 0".into(),
            ));
        }

        if self.auth.token_file.as_os_str().is_empty() {
            return Err(common::Error::Config("token_file must not be empty".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn clear_overrides() {
        unsafe {
            remove_env("FITCARD_BASE_URL");
            remove_env("FITCARD_TOKEN_FILE");
            remove_env("CONFIG_PATH");
        }
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("fitcard.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_full_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[api]
base_url = "https://fitcard.example.com/api"
connect_timeout_secs = 5
timeout_secs = 10

[auth]
token_file = "/var/lib/fitcard/tokens.json"
max_attempts = 2
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "https://fitcard.example.com/api");
        assert_eq!(config.api.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.api.timeout(), Duration::from_secs(10));
        assert_eq!(
            config.auth.token_file,
            PathBuf::from("/var/lib/fitcard/tokens.json")
        );
        assert_eq!(config.auth.max_attempts, 2);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "http://10.0.2.2:5000/api/");
        assert_eq!(config.api.connect_timeout_secs, 30);
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.auth.max_attempts, 3);
        assert!(config.auth.token_file.ends_with("fitcard/tokens.json"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/fitcard.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        assert!(matches!(Config::load(&path), Err(common::Error::Toml(_))));
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[api]\nbase_url = \"ftp://example.com\"\n");

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("base_url"), "got: {err}");
    }

    #[test]
    fn test_rejects_zero_values() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();

        for (toml, field) in [
            ("[api]\ntimeout_secs = 0\n", "timeout_secs"),
            ("[api]\nconnect_timeout_secs = 0\n", "connect_timeout_secs"),
            ("[auth]\nmax_attempts = 0\n", "max_attempts"),
        ] {
            let path = write_config(&dir, toml);
            let err = Config::load(&path).unwrap_err();
            assert!(err.to_string().contains(field), "got: {err}");
        }
    }

    #[test]
    fn test_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[api]\nbase_url = \"https://file.example.com/api\"\n",
        );

        unsafe {
            set_env("FITCARD_BASE_URL", "http://127.0.0.1:5000/api");
            set_env("FITCARD_TOKEN_FILE", "/tmp/fitcard-env-tokens.json");
        }
        let config = Config::load(&path).unwrap();
        clear_overrides();

        assert_eq!(config.api.base_url, "http://127.0.0.1:5000/api");
        assert_eq!(
            config.auth.token_file,
            PathBuf::from("/tmp/fitcard-env-tokens.json")
        );
    }

    #[test]
    fn test_invalid_env_base_url_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        unsafe { set_env("FITCARD_BASE_URL", "10.0.2.2:5000") };
        let result = Config::from_env();
        clear_overrides();
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_without_default_file_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let result = Config::resolve(None);
        std::env::set_current_dir(original).unwrap();

        let (config, path) = result.unwrap();
        assert!(path.is_none());
        assert_eq!(config.api.base_url, "http://10.0.2.2:5000/api/");
    }

    #[test]
    fn test_resolve_explicit_missing_file_is_error() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        assert!(Config::resolve(Some("/nonexistent/fitcard.toml")).is_err());

        unsafe { set_env("CONFIG_PATH", "/nonexistent/env-fitcard.toml") };
        let result = Config::resolve(None);
        clear_overrides();
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_loads_named_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[auth]\nmax_attempts = 5\n");

        let (config, loaded) = Config::resolve(path.to_str()).unwrap();
        assert_eq!(loaded, Some(path));
        assert_eq!(config.auth.max_attempts, 5);
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let path = Config::resolve_path(Some("/custom/path.toml"));
        assert_eq!(path, PathBuf::from("/custom/path.toml"));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("/env/path.toml"));
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("fitcard.toml"));
    }

    #[test]
    fn test_resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        assert_eq!(
            path,
            PathBuf::from("/cli/wins.toml"),
            "CLI arg must take precedence over CONFIG_PATH env var"
        );
        unsafe { remove_env("CONFIG_PATH") };
    }
}
