use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthClientConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Landing route overrides keyed by role name, e.g. `doctor = "/doctor/today"`.
    /// Checked when the route table is built from them.
    #[serde(default)]
    pub routes: BTreeMap<String, String>,
}

/// Bind settings for the demo authentication server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_accounts_path")]
    pub accounts_path: String,
    #[serde(default)]
    pub admin_addr: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8081,
            worker_threads: Some(4),
            accounts_path: default_accounts_path(),
            admin_addr: None,
        }
    }
}

/// Where the portal finds its authentication collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthClientConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AuthClientConfig {
    fn default() -> Self {
        Self { base_url: String::new(), timeout_secs: default_timeout_secs() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_session_path")]
    pub session_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { session_path: default_session_path() }
    }
}

/// Retry of transient collaborator failures. Off unless enabled explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

fn default_accounts_path() -> String {
    "data/accounts.json".into()
}

fn default_session_path() -> String {
    "data/session.json".into()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    200
}

fn default_backoff_max_ms() -> u64 {
    2000
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`); a missing file falls back to
    /// defaults plus environment overrides.
    pub fn load_and_validate() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let mut cfg = match std::fs::read_to_string(&path) {
            Ok(content) => parse(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
            Err(e) => return Err(anyhow!("cannot read {path}: {e}")),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.auth.normalize_from_env();
        self.auth.validate()?;
        self.storage.normalize_from_env();
        self.retry.validate()
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        if self.worker_threads.map_or(true, |w| w == 0) {
            self.worker_threads = Some(4);
        }
        if self.accounts_path.trim().is_empty() {
            self.accounts_path = default_accounts_path();
        }
        Ok(())
    }
}

impl AuthClientConfig {
    pub fn normalize_from_env(&mut self) {
        if self.base_url.trim().is_empty() {
            if let Ok(url) = std::env::var("AUTH_BASE_URL") {
                self.base_url = url;
            }
        }
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();
    }

    /// An empty base URL is allowed here; the portal binary rejects it when
    /// it actually needs the collaborator.
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.is_empty() {
            let lower = self.base_url.to_lowercase();
            if !(lower.starts_with("http://") || lower.starts_with("https://")) {
                return Err(anyhow!("auth.base_url must start with http:// or https://"));
            }
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("auth.timeout_secs must be a positive number of seconds"));
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(path) = std::env::var("SESSION_PATH") {
            if !path.trim().is_empty() {
                self.session_path = path;
            }
        }
        if self.session_path.trim().is_empty() {
            self.session_path = default_session_path();
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.max_attempts == 0 {
            return Err(anyhow!("retry.max_attempts must be >= 1 when retry is enabled"));
        }
        if self.backoff_max_ms < self.backoff_base_ms {
            return Err(anyhow!("retry.backoff_max_ms must be >= backoff_base_ms"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.auth.timeout_secs, 10);
        assert_eq!(cfg.storage.session_path, "data/session.json");
        assert!(!cfg.retry.enabled);
        assert!(cfg.routes.is_empty());
    }

    #[test]
    fn parses_full_document() {
        let cfg = parse(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000

            [auth]
            base_url = "http://localhost:9000/"
            timeout_secs = 3

            [retry]
            enabled = true
            max_attempts = 2

            [routes]
            doctor = "/doctor/today"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.auth.timeout_secs, 3);
        assert_eq!(cfg.retry.max_attempts, 2);
        assert_eq!(cfg.routes.get("doctor").map(String::as_str), Some("/doctor/today"));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let mut auth = AuthClientConfig { base_url: "http://auth.local/ ".into(), timeout_secs: 5 };
        auth.normalize_from_env();
        assert_eq!(auth.base_url, "http://auth.local");
    }

    #[test]
    fn rejects_bad_values() {
        let auth = AuthClientConfig { base_url: "ftp://x".into(), timeout_secs: 5 };
        let err = auth.validate().unwrap_err().to_string();
        assert!(err.contains("auth.base_url"), "{err}");

        let auth = AuthClientConfig { base_url: String::new(), timeout_secs: 0 };
        let err = auth.validate().unwrap_err().to_string();
        assert!(err.contains("auth.timeout_secs"), "{err}");

        let retry = RetryConfig { enabled: true, max_attempts: 0, ..RetryConfig::default() };
        let err = retry.validate().unwrap_err().to_string();
        assert!(err.contains("retry.max_attempts"), "{err}");
    }

    #[test]
    fn whole_config_validation_reports_failing_field() {
        let mut cfg = AppConfig::default();
        cfg.server.port = 0;
        let err = cfg.normalize_and_validate().unwrap_err().to_string();
        assert!(err.contains("server.port"), "{err}");

        let mut cfg = AppConfig::default();
        cfg.retry.backoff_base_ms = 5000;
        let err = cfg.normalize_and_validate().unwrap_err().to_string();
        assert!(err.contains("retry.backoff_max_ms"), "{err}");
    }
}
