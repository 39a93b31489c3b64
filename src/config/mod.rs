use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::credentials::{self, CredentialBundle};
use crate::utils::USER_AGENT;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Extraction strategy settings
    pub strategies: StrategiesConfig,

    /// Cookie bundle sources
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategiesConfig {
    /// Timeout for caption track downloads
    pub http_timeout_secs: u64,

    pub browser: BrowserConfig,

    pub yt_dlp: YtDlpConfig,

    pub transcript_api: TranscriptApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub enabled: bool,

    /// Node.js binary; the `playwright` package must be resolvable from it
    pub node_path: String,

    /// Upper bound on waiting for network quiescence
    pub navigation_timeout_secs: u64,

    /// Fixed delay after the page settles, before reading the player response
    pub settle_delay_ms: u64,

    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YtDlpConfig {
    pub enabled: bool,

    /// yt-dlp binary
    pub path: String,

    /// Upper bound on one yt-dlp invocation
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptApiConfig {
    pub enabled: bool,

    /// Upper bound on each listing/fetch request
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Base64-encoded Netscape cookie file (preferred)
    pub cookies_b64: Option<String>,

    /// Plain Netscape cookie file text
    pub cookies: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for StrategiesConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: 30,
            browser: BrowserConfig::default(),
            yt_dlp: YtDlpConfig::default(),
            transcript_api: TranscriptApiConfig::default(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            node_path: "node".to_string(),
            navigation_timeout_secs: 30,
            settle_delay_ms: 3000,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "yt-dlp".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for TranscriptApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 20,
        }
    }
}

impl Config {
    /// Load configuration from file (if any), then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Apply overrides from an environment-like lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = var("SUBTITLE_API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("SUBTITLE_API_PORT").or_else(|| var("PORT")) {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid port override: {}", port),
            }
        }
        if let Some(cookies_b64) = var("YOUTUBE_COOKIES_B64") {
            self.credentials.cookies_b64 = Some(cookies_b64);
        }
        if let Some(cookies) = var("YOUTUBE_COOKIES") {
            self.credentials.cookies = Some(cookies);
        }
        if let Some(path) = var("YT_DLP_PATH") {
            self.strategies.yt_dlp.path = path;
        }
        if let Some(node) = var("NODE_BIN") {
            self.strategies.browser.node_path = node;
        }
    }

    /// Get configuration file path
    fn config_path() -> Option<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        dirs::config_dir().map(|dir| dir.join("subtitle-api").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            anyhow::bail!("Server host must not be empty");
        }

        if self.strategies.browser.navigation_timeout_secs == 0 {
            anyhow::bail!("Browser navigation timeout must be greater than 0");
        }

        if self.strategies.yt_dlp.timeout_secs == 0 || self.strategies.transcript_api.timeout_secs == 0 {
            anyhow::bail!("Strategy timeouts must be greater than 0");
        }

        Ok(())
    }

    /// Resolve the cookie bundle; done once, when the pipeline is built
    pub fn credential_bundle(&self) -> CredentialBundle {
        credentials::resolve(
            self.credentials.cookies_b64.as_deref(),
            self.credentials.cookies.as_deref(),
        )
    }

    /// Bind address for the HTTP server
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Display current configuration
    pub fn display(&self) {
        let set = |value: &Option<String>| if value.is_some() { "set" } else { "not set" };
        let strategies = &self.strategies;

        println!("Current Configuration:");
        println!("  Listen Address: {}", self.socket_addr());
        println!(
            "  Browser Strategy: {} (node: {}, timeout: {}s, settle: {}ms)",
            enabled(strategies.browser.enabled),
            strategies.browser.node_path,
            strategies.browser.navigation_timeout_secs,
            strategies.browser.settle_delay_ms
        );
        println!(
            "  yt-dlp Strategy: {} (path: {}, timeout: {}s)",
            enabled(strategies.yt_dlp.enabled),
            strategies.yt_dlp.path,
            strategies.yt_dlp.timeout_secs
        );
        println!(
            "  Transcript API Strategy: {} (timeout: {}s)",
            enabled(strategies.transcript_api.enabled),
            strategies.transcript_api.timeout_secs
        );
        println!("  Cookies (base64): {}", set(&self.credentials.cookies_b64));
        println!("  Cookies (plain): {}", set(&self.credentials.cookies));
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.socket_addr(), "0.0.0.0:8080");
        assert_eq!(config.strategies.browser.navigation_timeout_secs, 30);
        assert_eq!(config.strategies.yt_dlp.path, "yt-dlp");
        assert!(config.credential_bundle().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("PORT", "9000"),
            ("YOUTUBE_COOKIES", "plain"),
            ("YT_DLP_PATH", "/opt/yt-dlp"),
        ]));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.credentials.cookies.as_deref(), Some("plain"));
        assert_eq!(config.strategies.yt_dlp.path, "/opt/yt-dlp");
    }

    #[test]
    fn test_invalid_port_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[("SUBTITLE_API_PORT", "not-a-port")]));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_encoded_cookies_preferred() {
        let mut config = Config::default();
        // "from-b64"
        config.apply_overrides(lookup(&[
            ("YOUTUBE_COOKIES_B64", "ZnJvbS1iNjQ="),
            ("YOUTUBE_COOKIES", "plain"),
        ]));
        assert_eq!(config.credential_bundle().as_str(), "from-b64");
    }

    #[test]
    fn test_load_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  port: 3000\nstrategies:\n  browser:\n    enabled: false"
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(!config.strategies.browser.enabled);
        assert!(config.strategies.yt_dlp.enabled);
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = Config::default();
        config.strategies.yt_dlp.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
