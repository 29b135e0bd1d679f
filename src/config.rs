use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub security: SecurityConfig,

    pub captcha: CaptchaConfig,

    pub upstream: UpstreamConfig,

    pub geocoder: GeocoderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// 0 means "let tokio decide".
    pub worker_threads: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:leakcheck.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8710,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Canonical production domain. Requests are accepted only when their
    /// origin/referrer host equals this domain or a subdomain of it.
    pub canonical_domain: String,

    /// Hosts accepted during local development (checked by exact host match).
    pub allowed_dev_hosts: Vec<String>,

    /// Lookups allowed per client key per calendar day.
    pub daily_lookup_limit: i32,

    /// Whether a successful provider response that carries no data still
    /// counts against the daily quota. The source system counted it.
    pub count_empty_results: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            canonical_domain: "leakdata.org".to_string(),
            allowed_dev_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
            daily_lookup_limit: crate::constants::limits::DAILY_LOOKUP_LIMIT,
            count_empty_results: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptchaConfig {
    pub secret_key: String,

    pub verify_url: String,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            verify_url: "https://challenges.cloudflare.com/turnstile/v0/siteverify".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the third-party lookup provider. Must be set for the
    /// gateway to proxy anything.
    pub base_url: String,

    pub request_timeout_seconds: u64,

    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            request_timeout_seconds: 30,
            user_agent: "Mozilla/5.0 (compatible; LeakDataChecker/1.0)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    pub fn create_default_if_missing() -> Result<()> {
        let path = Self::default_config_path();
        if !path.exists() {
            Self::default().save_to_path(&path)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.security.canonical_domain.trim().is_empty() {
            anyhow::bail!("security.canonical_domain must not be empty");
        }

        if self.security.daily_lookup_limit <= 0 {
            anyhow::bail!(
                "security.daily_lookup_limit must be positive, got {}",
                self.security.daily_lookup_limit
            );
        }

        if self.upstream.base_url.trim().is_empty() {
            anyhow::bail!("upstream.base_url is not configured");
        }

        Ok(())
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("leakcheck").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".leakcheck").join("config.toml"));
        }

        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_except_upstream() {
        let config = Config::default();
        // The upstream base URL has no sensible default and must be configured.
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.upstream.base_url = "https://provider.example/api".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_limit() {
        let mut config = Config::default();
        config.upstream.base_url = "https://provider.example/api".to_string();
        config.security.daily_lookup_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn roundtrips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(
            parsed.security.daily_lookup_limit,
            config.security.daily_lookup_limit
        );
        assert_eq!(parsed.security.canonical_domain, "leakdata.org");
    }
}
