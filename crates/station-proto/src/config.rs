use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub station: StationConfig,
}

/// Control-port connection to the audio engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_host")]
    pub host: String,
    #[serde(default = "default_engine_port")]
    pub port: u16,
    /// Operator interface name the engine was started with; prefixes the
    /// `metadata` and `skip` commands on the wire.
    #[serde(default = "default_iface")]
    pub iface: String,
    #[serde(default = "default_socket_timeout_ms")]
    pub socket_timeout_ms: u64,
    /// Upper bound on a single control-port response.
    #[serde(default = "default_response_cap_bytes")]
    pub response_cap_bytes: usize,
}

/// Companion streaming server (listener stats).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Base URL, e.g. `http://127.0.0.1:24100`.
    #[serde(default = "default_status_base_url")]
    pub base_url: String,
    #[serde(default = "default_status_timeout_ms")]
    pub timeout_ms: u64,
}

/// Media library and ingestion policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_media_dir")]
    pub dir: PathBuf,
    /// Audio container the fetch tool is asked to produce.
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,
    #[serde(default = "default_max_filesize_mb")]
    pub max_filesize_mb: u64,
    /// Explicit path to the fetch tool; when unset the binary is located
    /// via env var / executable dir / PATH.
    #[serde(default)]
    pub fetch_binary: Option<PathBuf>,
    /// Source URL handed to the fetch tool; `{id}` is replaced with the
    /// media identifier.
    #[serde(default = "default_source_url_template")]
    pub source_url_template: String,
}

impl MediaConfig {
    pub fn source_url(&self, media_id: &str) -> String {
        self.source_url_template.replace("{id}", media_id)
    }
}

/// Station policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    /// Nicknames allowed to rename anyone's songs.
    #[serde(default)]
    pub admins: Vec<String>,
    /// Attribution used for catalog rows adopted from orphan files.
    #[serde(default = "default_system_user")]
    pub system_user: String,
    /// Attempts when queueing a random song by submitter.
    #[serde(default = "default_random_queue_retries")]
    pub random_queue_retries: usize,
    /// How long a history snapshot stays fresh.
    #[serde(default = "default_history_cache_ms")]
    pub history_cache_ms: u64,
    /// Max disambiguation candidates returned from a lookup.
    #[serde(default = "default_candidate_cap")]
    pub candidate_cap: usize,
    /// Minimum characters for a catalog search query.
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: default_engine_host(),
            port: default_engine_port(),
            iface: default_iface(),
            socket_timeout_ms: default_socket_timeout_ms(),
            response_cap_bytes: default_response_cap_bytes(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            base_url: default_status_base_url(),
            timeout_ms: default_status_timeout_ms(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            dir: default_media_dir(),
            extension: default_extension(),
            max_duration_secs: default_max_duration_secs(),
            max_filesize_mb: default_max_filesize_mb(),
            fetch_binary: None,
            source_url_template: default_source_url_template(),
        }
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            admins: Vec::new(),
            system_user: default_system_user(),
            random_queue_retries: default_random_queue_retries(),
            history_cache_ms: default_history_cache_ms(),
            candidate_cap: default_candidate_cap(),
            min_query_chars: default_min_query_chars(),
        }
    }
}

fn default_engine_host() -> String {
    "127.0.0.1".to_string()
}

fn default_engine_port() -> u16 {
    23000
}

fn default_iface() -> String {
    "radio".to_string()
}

fn default_socket_timeout_ms() -> u64 {
    5000
}

fn default_response_cap_bytes() -> usize {
    4 * 1024 * 1024
}

fn default_status_base_url() -> String {
    "http://127.0.0.1:24100".to_string()
}

fn default_status_timeout_ms() -> u64 {
    5000
}

fn default_media_dir() -> PathBuf {
    platform::data_dir().join("music")
}

fn default_extension() -> String {
    "ogg".to_string()
}

fn default_max_duration_secs() -> u64 {
    1800
}

fn default_max_filesize_mb() -> u64 {
    30
}

fn default_source_url_template() -> String {
    "https://www.youtube.com/watch?v={id}".to_string()
}

fn default_system_user() -> String {
    "radio".to_string()
}

fn default_random_queue_retries() -> usize {
    5
}

fn default_history_cache_ms() -> u64 {
    5000
}

fn default_candidate_cap() -> usize {
    4
}

fn default_min_query_chars() -> usize {
    3
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
        let config: Self = toml::from_str(&content)?;
        Ok(config)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.port, 23000);
        assert_eq!(config.engine.iface, "radio");
        assert_eq!(config.media.max_duration_secs, 1800);
        assert_eq!(config.media.max_filesize_mb, 30);
        assert_eq!(config.media.extension, "ogg");
        assert_eq!(config.station.random_queue_retries, 5);
        assert!(config.status.base_url.starts_with("http://"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [engine]
            host = "10.0.0.5"

            [station]
            admins = ["alice"]
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.host, "10.0.0.5");
        assert_eq!(config.engine.port, 23000);
        assert_eq!(config.station.admins, vec!["alice".to_string()]);
        assert_eq!(config.station.system_user, "radio");
    }
}
