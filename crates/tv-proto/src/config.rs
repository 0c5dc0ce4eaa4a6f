use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;
use crate::registry::{ALL_REGIONS, CATEGORY_PARTITIONS};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_socket_port")]
    pub socket_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_http_port")]
    pub port: u16,
}

/// Where playlist documents come from and how long to wait for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Documents live at `<base_url>/categories/<label>.<extension>` and
    /// `<base_url>/countries/<code>.<extension>`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Region loaded at startup.
    #[serde(default = "default_initial_region")]
    pub initial_region: String,
    /// Categories fetched when the region is `"all"`, in fetch order.
    #[serde(default = "default_category_partitions")]
    pub category_partitions: Vec<String>,
}

/// Settings read by the playback side, not by the catalog itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_true")]
    pub auto_skip_broken: bool,
    #[serde(default = "default_true")]
    pub subtitles_enabled: bool,
    /// How long buffering must persist before a channel counts as broken.
    #[serde(default = "default_buffering_grace_ms")]
    pub buffering_grace_ms: u64,
    /// After a channel switch, buffering is expected and ignored this long.
    #[serde(default = "default_zap_window_ms")]
    pub zap_window_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            socket_port: default_socket_port(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            port: default_http_port(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            extension: default_extension(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            initial_region: default_initial_region(),
            category_partitions: default_category_partitions(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            auto_skip_broken: true,
            subtitles_enabled: true,
            buffering_grace_ms: default_buffering_grace_ms(),
            zap_window_ms: default_zap_window_ms(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_socket_port() -> u16 {
    platform::DAEMON_TCP_PORT
}

fn default_http_enabled() -> bool {
    true
}

fn default_http_port() -> u16 {
    8988
}

fn default_base_url() -> String {
    "https://iptv-org.github.io/iptv".to_string()
}

fn default_extension() -> String {
    "m3u".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    15
}

fn default_read_timeout_secs() -> u64 {
    30
}

fn default_initial_region() -> String {
    ALL_REGIONS.to_string()
}

fn default_category_partitions() -> Vec<String> {
    CATEGORY_PARTITIONS.iter().map(|c| c.to_string()).collect()
}

fn default_true() -> bool {
    true
}

fn default_buffering_grace_ms() -> u64 {
    5000
}

fn default_zap_window_ms() -> u64 {
    2000
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
