use anyhow::{Context, Result, anyhow};
use log::LevelFilter;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use logstash_mcp::{
    Thresholds,
    client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT},
};

/// Environment variable that overrides `base_url`.
pub const BASE_URL_ENV: &str = "LOGSTASH_API_BASE";

/// Runtime settings, read from `config.toml` with every key optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Register the mutating `logstash_reload_pipeline` tool.
    pub allow_reload: bool,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub dashboard_addr: String,
    pub thresholds: Thresholds,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            allow_reload: false,
            log_dir: PathBuf::from("logs"),
            log_level: "info".to_string(),
            dashboard_addr: "127.0.0.1:5001".to_string(),
            thresholds: Thresholds::default(),
        }
    }
}

impl AppConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| anyhow!("invalid log_level '{}'", self.log_level))
    }

    /// A non-empty `LOGSTASH_API_BASE` wins over the file.
    pub fn with_env_base_url(mut self, env_value: Option<String>) -> Self {
        if let Some(url) = env_value.filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        self
    }
}

/// `<config dir>/logstash-mcp/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("logstash-mcp")
        .join("config.toml")
}

/// Parse a config file. A missing file yields the defaults unless it was
/// asked for explicitly.
pub fn load_config(path: &Path, explicit: bool) -> Result<AppConfig> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => {
            return Ok(AppConfig::default());
        }
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };

    toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Config file (explicit or default location) plus the environment override.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig> {
    let config = match explicit {
        Some(path) => load_config(path, true)?,
        None => load_config(&default_config_path(), false)?,
    };
    Ok(config.with_env_base_url(std::env::var(BASE_URL_ENV).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.base_url, "http://localhost:9600");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(!config.allow_reload);
    }

    #[test]
    fn partial_thresholds_keep_other_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            base_url = "http://ls-01:9600"
            allow_reload = true

            [thresholds]
            heap_ratio = 0.9
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "http://ls-01:9600");
        assert!(config.allow_reload);
        assert_eq!(config.thresholds.heap_ratio, 0.9);
        assert_eq!(config.thresholds.backpressure_critical, 0.10);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn env_overrides_file_base_url() {
        let config = AppConfig::default().with_env_base_url(Some("http://other:9601".into()));
        assert_eq!(config.base_url, "http://other:9601");

        let config = AppConfig::default().with_env_base_url(Some("  ".into()));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn missing_default_file_is_fine_but_explicit_is_not() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert_eq!(load_config(&path, false).unwrap(), AppConfig::default());
        assert!(load_config(&path, true).is_err());
    }

    #[test]
    fn invalid_toml_names_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout_secs = \"soon\"").unwrap();

        let err = load_config(file.path(), true).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }

    #[test]
    fn reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout_secs = 12\nlog_level = \"debug\"").unwrap();

        let config = load_config(file.path(), true).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(12));
        assert_eq!(config.level_filter().unwrap(), LevelFilter::Debug);
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let config = AppConfig {
            log_level: "chatty".into(),
            ..AppConfig::default()
        };
        assert!(config.level_filter().is_err());
    }
}
